//! Monitoring-system collaborators: web session with graph download and the
//! JSON-RPC event API.

use std::path::PathBuf;

use thiserror::Error;

pub mod rpc_client;
pub mod web_session;

pub use rpc_client::{EventRow, ZabbixRpcClient, ZabbixRpcConfig};
pub use web_session::{GraphImage, GraphRequest, ZabbixWebConfig, ZabbixWebSession};

#[derive(Debug, Error)]
pub enum ZabbixError {
    #[error("authentication against the monitoring web UI failed (no session cookie returned)")]
    AuthenticationFailed,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("graph image not found at {url}")]
    ImageNotFound { url: String },
    #[error("monitoring {operation} returned status {status}")]
    UnexpectedStatus {
        operation: &'static str,
        status: u16,
    },
    #[error("failed to write graph image to {}", path.display())]
    ImageWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("rpc {method} failed: {message} (code {code})")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },
    #[error("unexpected rpc response shape: {0}")]
    UnexpectedResponseShape(String),
}

/// Builds the blocking HTTP client shared by both monitoring collaborators.
/// Redirects stay unfollowed so login cookies on intermediate responses are
/// observable.
pub(crate) fn build_http_client(
    proxy: Option<&str>,
    tls_verify: bool,
) -> Result<reqwest::blocking::Client, ZabbixError> {
    let mut builder = reqwest::blocking::Client::builder()
        .redirect(reqwest::redirect::Policy::none());
    if let Some(proxy) = proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy)?);
    }
    if !tls_verify {
        builder = builder.danger_accept_invalid_certs(true);
    }
    Ok(builder.build()?)
}
