//! Authenticated web-UI session and rendered-graph download.

use std::{fs, path::Path, path::PathBuf};

use reqwest::header::{COOKIE, LOCATION, SET_COOKIE};
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::{build_http_client, ZabbixError};

#[derive(Debug, Clone)]
pub struct ZabbixWebConfig {
    pub server: String,
    pub username: String,
    pub password: String,
    pub proxy: Option<String>,
    pub tls_verify: bool,
}

/// Parameters for one rendered metric graph.
#[derive(Debug, Clone)]
pub struct GraphRequest {
    pub item_id: i64,
    pub period: i64,
    pub title: String,
    pub width: i64,
    pub height: i64,
}

/// Downloaded graph image on disk, scoped to the invocation. The file is
/// removed when the guard drops.
#[derive(Debug)]
pub struct GraphImage {
    path: PathBuf,
}

impl GraphImage {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for GraphImage {
    fn drop(&mut self) {
        if let Err(error) = fs::remove_file(&self.path) {
            debug!(
                "failed to remove graph temp file {}: {error}",
                self.path.display()
            );
        }
    }
}

/// Web-UI session. Logged in once at construction time; the session cookie is
/// owned state reused for every graph download.
pub struct ZabbixWebSession {
    http: reqwest::blocking::Client,
    server: String,
    username: String,
    password: String,
    cookie: Option<String>,
}

impl ZabbixWebSession {
    pub fn new(config: &ZabbixWebConfig) -> Result<Self, ZabbixError> {
        let http = build_http_client(config.proxy.as_deref(), config.tls_verify)?;
        Ok(Self {
            http,
            server: config.server.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            cookie: None,
        })
    }

    /// Signs in through the web login form and captures the session cookie.
    /// No cookie in the response means the credentials were rejected.
    pub fn login(&mut self) -> Result<(), ZabbixError> {
        let response = self
            .http
            .post(format!("{}/", self.server))
            .form(&[
                ("name", self.username.as_str()),
                ("password", self.password.as_str()),
                ("enter", "Sign in"),
            ])
            .send()?;

        if response.status().is_redirection() {
            if let Some(location) = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
            {
                warn!(
                    "login redirected to '{location}'; the configured server URL may be missing \
                     its path prefix"
                );
            }
        }

        let cookie = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| value.split(';').next())
            .collect::<Vec<_>>()
            .join("; ");
        if cookie.is_empty() {
            return Err(ZabbixError::AuthenticationFailed);
        }
        self.cookie = Some(cookie);
        Ok(())
    }

    /// Downloads the rendered graph into `tmp_dir` and returns the scoped
    /// file guard. Requires a prior successful [`ZabbixWebSession::login`].
    pub fn fetch_graph(
        &self,
        request: &GraphRequest,
        tmp_dir: &Path,
    ) -> Result<GraphImage, ZabbixError> {
        let cookie = self
            .cookie
            .as_deref()
            .ok_or(ZabbixError::AuthenticationFailed)?;

        let url = format!("{}/chart3.php", self.server);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("period", request.period.to_string()),
                ("name", request.title.clone()),
                ("width", request.width.to_string()),
                ("height", request.height.to_string()),
                ("graphtype", "0".to_string()),
                ("legend", "1".to_string()),
                ("items[0][itemid]", request.item_id.to_string()),
                ("items[0][sortorder]", "0".to_string()),
                ("items[0][drawtype]", "5".to_string()),
                ("items[0][color]", "00CC00".to_string()),
            ])
            .header(COOKIE, cookie)
            .send()?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ZabbixError::ImageNotFound { url });
        }
        if !status.is_success() {
            return Err(ZabbixError::UnexpectedStatus {
                operation: "graph download",
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes()?;
        fs::create_dir_all(tmp_dir).map_err(|source| ZabbixError::ImageWrite {
            path: tmp_dir.to_path_buf(),
            source,
        })?;
        let path = tmp_dir.join(format!("{}.png", request.item_id));
        fs::write(&path, &bytes).map_err(|source| ZabbixError::ImageWrite {
            path: path.clone(),
            source,
        })?;
        Ok(GraphImage { path })
    }
}
