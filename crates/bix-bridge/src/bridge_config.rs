//! Process configuration, built once at startup from the CLI surface and
//! passed by reference into every component.

use std::path::PathBuf;

use anyhow::{bail, Result};

use bix_zabbix::{ZabbixRpcConfig, ZabbixWebConfig};

use crate::cli_args::Cli;

/// How the close transition is selected: a fixed id, or a display name
/// resolved per ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseTransition {
    Id(String),
    Name(String),
}

impl CloseTransition {
    pub fn parse(raw: &str) -> Self {
        if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()) {
            Self::Id(raw.to_string())
        } else {
            Self::Name(raw.to_string())
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub server: String,
    pub user: String,
    pub pass: String,
    pub project: String,
    pub issue_type: String,
    pub close_transition: CloseTransition,
    pub search_fallback: bool,
}

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub url: String,
    pub proxy: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub tracker: TrackerConfig,
    pub monitor_web: Option<ZabbixWebConfig>,
    pub monitor_rpc: Option<ZabbixRpcConfig>,
    pub webhook: Option<WebhookConfig>,
    pub alert_prefix: String,
    pub store_path: PathBuf,
    pub tmp_dir: PathBuf,
}

impl BridgeConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let monitor_web = match (&cli.monitor_web_user, &cli.monitor_web_pass) {
            (Some(username), Some(password)) => Some(ZabbixWebConfig {
                server: require_monitor_server(cli, "web credentials")?,
                username: username.clone(),
                password: password.clone(),
                proxy: cli.monitor_proxy.clone(),
                tls_verify: cli.monitor_tls_verify,
            }),
            (None, None) => None,
            _ => bail!(
                "monitoring web credentials require both --monitor-web-user and \
                 --monitor-web-pass"
            ),
        };
        let monitor_rpc = match (&cli.monitor_api_user, &cli.monitor_api_pass) {
            (Some(username), Some(password)) => Some(ZabbixRpcConfig {
                server: require_monitor_server(cli, "api credentials")?,
                username: username.clone(),
                password: password.clone(),
                proxy: cli.monitor_proxy.clone(),
                tls_verify: cli.monitor_tls_verify,
            }),
            (None, None) => None,
            _ => bail!(
                "monitoring api credentials require both --monitor-api-user and \
                 --monitor-api-pass"
            ),
        };
        let webhook = cli.webhook_url.as_ref().map(|url| WebhookConfig {
            url: url.clone(),
            proxy: cli.webhook_proxy.clone(),
        });

        Ok(Self {
            tracker: TrackerConfig {
                server: cli.tracker_server.trim_end_matches('/').to_string(),
                user: cli.tracker_user.clone(),
                pass: cli.tracker_pass.clone(),
                project: cli.tracker_project.clone(),
                issue_type: cli.tracker_issue_type.clone(),
                close_transition: CloseTransition::parse(&cli.tracker_close_transition),
                search_fallback: cli.tracker_search_fallback,
            },
            monitor_web,
            monitor_rpc,
            webhook,
            alert_prefix: cli.alert_prefix.clone(),
            store_path: cli.store_path.clone(),
            tmp_dir: cli.tmp_dir.clone(),
        })
    }
}

fn require_monitor_server(cli: &Cli, needed_for: &str) -> Result<String> {
    match &cli.monitor_server {
        Some(server) => Ok(server.trim_end_matches('/').to_string()),
        None => bail!("--monitor-server is required when monitoring {needed_for} are set"),
    }
}
