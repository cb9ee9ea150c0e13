//! JSON-RPC client for the monitoring API (event lookup and acknowledge).

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{build_http_client, ZabbixError};

#[derive(Debug, Clone)]
pub struct ZabbixRpcConfig {
    pub server: String,
    pub username: String,
    pub password: String,
    pub proxy: Option<String>,
    pub tls_verify: bool,
}

#[derive(Debug, Deserialize)]
struct RpcFailureBody {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope<T> {
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    error: Option<RpcFailureBody>,
}

/// One event row as returned by the RPC event lookup. The API reports fields
/// as strings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct EventRow {
    pub eventid: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub acknowledged: Option<String>,
}

/// RPC client holding the auth token obtained by [`ZabbixRpcClient::login`].
pub struct ZabbixRpcClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    username: String,
    password: String,
    auth: Option<String>,
    next_id: u64,
}

impl ZabbixRpcClient {
    pub fn new(config: &ZabbixRpcConfig) -> Result<Self, ZabbixError> {
        let http = build_http_client(config.proxy.as_deref(), config.tls_verify)?;
        Ok(Self {
            http,
            endpoint: format!(
                "{}/api_jsonrpc.php",
                config.server.trim_end_matches('/')
            ),
            username: config.username.clone(),
            password: config.password.clone(),
            auth: None,
            next_id: 1,
        })
    }

    /// Obtains an API token; subsequent calls carry it automatically.
    pub fn login(&mut self) -> Result<(), ZabbixError> {
        let params = json!({
            "user": self.username,
            "password": self.password,
        });
        let token: String = self.call("user.login", params)?;
        self.auth = Some(token);
        Ok(())
    }

    /// Looks up one event by id. The API returns a list; anything other than
    /// a decodable list with a matching row is an unexpected shape.
    pub fn get_event(&mut self, event_id: i64) -> Result<EventRow, ZabbixError> {
        let params = json!({
            "output": ["eventid", "value", "acknowledged"],
            "eventids": [event_id.to_string()],
        });
        let rows: Vec<EventRow> = self.call("event.get", params)?;
        let count = rows.len();
        rows.into_iter().next().ok_or_else(|| {
            ZabbixError::UnexpectedResponseShape(format!(
                "event.get: expected one event row for id {event_id}, got {count}"
            ))
        })
    }

    pub fn acknowledge_event(&mut self, event_id: i64, message: &str) -> Result<(), ZabbixError> {
        let params = json!({
            "eventids": event_id.to_string(),
            "message": message,
        });
        let _receipt: Value = self.call("event.acknowledge", params)?;
        Ok(())
    }

    fn call<T>(&mut self, method: &str, params: Value) -> Result<T, ZabbixError>
    where
        T: DeserializeOwned + Default,
    {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        let mut payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });
        if let Some(auth) = &self.auth {
            payload["auth"] = json!(auth);
        }

        let response = self.http.post(&self.endpoint).json(&payload).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(ZabbixError::UnexpectedStatus {
                operation: "rpc call",
                status: status.as_u16(),
            });
        }

        let body = response.text()?;
        let envelope: RpcEnvelope<T> = serde_json::from_str(&body).map_err(|error| {
            ZabbixError::UnexpectedResponseShape(format!("{method}: {error}"))
        })?;
        if let Some(failure) = envelope.error {
            let mut message = failure.message;
            if let Some(data) = failure.data {
                message = format!("{message} {data}");
            }
            return Err(ZabbixError::Rpc {
                method: method.to_string(),
                code: failure.code,
                message,
            });
        }
        envelope.result.ok_or_else(|| {
            ZabbixError::UnexpectedResponseShape(format!(
                "{method}: response carried neither result nor error"
            ))
        })
    }
}
