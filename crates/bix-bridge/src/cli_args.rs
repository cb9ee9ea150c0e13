//! Command-line surface for the alert bridge.
//!
//! The monitoring system invokes the binary with positional arguments;
//! everything else is configuration, overridable per flag or `BIX_*`
//! environment variable.

use std::path::PathBuf;

use clap::{ArgAction, Parser};

#[derive(Debug, Parser)]
#[command(
    name = "bix-bridge",
    about = "Bridges monitoring alert notifications into issue-tracker tickets",
    version
)]
pub struct Cli {
    #[arg(help = "Ticket assignee, as supplied by the alert action")]
    pub assignee: String,

    #[arg(help = "Alert subject line, used as the ticket summary")]
    pub subject: String,

    #[arg(help = "Raw alert body, including prefixed setting lines")]
    pub body: String,

    #[arg(help = "Monitoring event id, when the alert action supplies one")]
    pub event_id: Option<i64>,

    #[arg(long, env = "BIX_TRACKER_SERVER", help = "Issue tracker base URL")]
    pub tracker_server: String,

    #[arg(long, env = "BIX_TRACKER_USER", help = "Issue tracker login")]
    pub tracker_user: String,

    #[arg(
        long,
        env = "BIX_TRACKER_PASS",
        hide_env_values = true,
        help = "Issue tracker password or API token"
    )]
    pub tracker_pass: String,

    #[arg(long, env = "BIX_TRACKER_PROJECT", help = "Project key tickets are created in")]
    pub tracker_project: String,

    #[arg(
        long,
        env = "BIX_TRACKER_ISSUE_TYPE",
        default_value = "Incident",
        help = "Issue type for created tickets"
    )]
    pub tracker_issue_type: String,

    #[arg(
        long,
        env = "BIX_TRACKER_CLOSE_TRANSITION",
        help = "Close transition: a numeric id is used directly, any other text is resolved \
                against the ticket's transitions by display name"
    )]
    pub tracker_close_transition: String,

    #[arg(
        long,
        env = "BIX_TRACKER_SEARCH_FALLBACK",
        default_value_t = false,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        help = "On a resolved alert with no tracked row, search the tracker for open \
                labelled tickets and close them"
    )]
    pub tracker_search_fallback: bool,

    #[arg(long, env = "BIX_MONITOR_SERVER", help = "Monitoring system base URL")]
    pub monitor_server: Option<String>,

    #[arg(
        long,
        env = "BIX_MONITOR_WEB_USER",
        help = "Monitoring web UI login used for graph downloads"
    )]
    pub monitor_web_user: Option<String>,

    #[arg(
        long,
        env = "BIX_MONITOR_WEB_PASS",
        hide_env_values = true,
        help = "Monitoring web UI password"
    )]
    pub monitor_web_pass: Option<String>,

    #[arg(
        long,
        env = "BIX_MONITOR_API_USER",
        help = "Monitoring JSON-RPC login used for event acknowledgement"
    )]
    pub monitor_api_user: Option<String>,

    #[arg(
        long,
        env = "BIX_MONITOR_API_PASS",
        hide_env_values = true,
        help = "Monitoring JSON-RPC password"
    )]
    pub monitor_api_pass: Option<String>,

    #[arg(
        long,
        env = "BIX_MONITOR_PROXY",
        help = "Proxy URL for monitoring-system requests"
    )]
    pub monitor_proxy: Option<String>,

    #[arg(
        long,
        env = "BIX_MONITOR_TLS_VERIFY",
        default_value_t = true,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        help = "Verify the monitoring system's TLS certificate"
    )]
    pub monitor_tls_verify: bool,

    #[arg(long, env = "BIX_WEBHOOK_URL", help = "Chat webhook URL for incident cards")]
    pub webhook_url: Option<String>,

    #[arg(long, env = "BIX_WEBHOOK_PROXY", help = "Proxy URL for webhook delivery")]
    pub webhook_proxy: Option<String>,

    #[arg(
        long,
        env = "BIX_ALERT_PREFIX",
        default_value = "zbx",
        help = "Prefix token marking settings lines in the alert body"
    )]
    pub alert_prefix: String,

    #[arg(
        long,
        env = "BIX_STORE_PATH",
        default_value = ".bix/incidents.db",
        help = "Path of the tracked-incident database"
    )]
    pub store_path: PathBuf,

    #[arg(
        long,
        env = "BIX_TMP_DIR",
        default_value = "/tmp/bix",
        help = "Directory for downloaded graph images"
    )]
    pub tmp_dir: PathBuf,
}
