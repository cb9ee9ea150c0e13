//! Reconciler tests: decision table plus end-to-end runs against mock
//! tracker, monitoring, and webhook servers.

use std::path::Path;

use clap::Parser;
use httpmock::prelude::*;
use serde_json::json;

use bix_store::IncidentStore;
use bix_zabbix::ZabbixWebConfig;

use super::bridge_config::{
    BridgeConfig, CloseTransition, TrackerConfig, WebhookConfig,
};
use super::cli_args::Cli;
use super::reconciler::{decide, run_alert, AlertInvocation, ReconcileDecision};

const PROBLEM_BODY: &str = "zbx;triggerid:42\nzbx;ok:0\nzbx;priority:High\nDisk full on host X";
const RESOLVED_BODY: &str = "zbx;triggerid:42\nzbx;ok:1\nResolved";

fn test_config(tracker_url: &str, store_path: &Path, tmp_dir: &Path) -> BridgeConfig {
    BridgeConfig {
        tracker: TrackerConfig {
            server: tracker_url.trim_end_matches('/').to_string(),
            user: "bridge".to_string(),
            pass: "secret".to_string(),
            project: "OPS".to_string(),
            issue_type: "Incident".to_string(),
            close_transition: CloseTransition::Id("41".to_string()),
            search_fallback: false,
        },
        monitor_web: None,
        monitor_rpc: None,
        webhook: None,
        alert_prefix: "zbx".to_string(),
        store_path: store_path.to_path_buf(),
        tmp_dir: tmp_dir.to_path_buf(),
    }
}

fn invocation(body: &str) -> AlertInvocation {
    AlertInvocation {
        assignee: "oncall".to_string(),
        subject: "Disk full on host X".to_string(),
        body: body.to_string(),
        event_id: None,
    }
}

#[test]
fn decide_covers_the_full_state_table() {
    assert_eq!(decide(None, false), ReconcileDecision::OpenTicket);
    assert_eq!(decide(None, true), ReconcileDecision::SkipUntracked);
    assert_eq!(
        decide(Some("OPS-7".to_string()), true),
        ReconcileDecision::CloseTicket {
            ticket_key: "OPS-7".to_string()
        }
    );
    assert_eq!(
        decide(Some("OPS-7".to_string()), false),
        ReconcileDecision::CommentExisting {
            ticket_key: "OPS-7".to_string()
        }
    );
}

#[test]
fn problem_alert_creates_ticket_and_tracks_row() {
    let jira = MockServer::start();
    let create = jira.mock(|when, then| {
        when.method(POST).path("/rest/api/2/issue");
        then.status(201).json_body(json!({"key": "OPS-7"}));
    });

    let temp = tempfile::tempdir().expect("tempdir");
    let store_path = temp.path().join("incidents.db");
    let config = test_config(&jira.base_url(), &store_path, temp.path());

    let report = run_alert(&config, &invocation(PROBLEM_BODY)).expect("run");
    assert_eq!(report.action, "open");
    assert_eq!(report.trigger_id, 42);
    assert_eq!(report.ticket_key.as_deref(), Some("OPS-7"));
    assert!(!report.graph_attached);
    assert!(!report.notified);
    assert_eq!(create.calls(), 1);

    let store = IncidentStore::open(&store_path).expect("store");
    assert_eq!(store.lookup(42).expect("lookup"), Some("OPS-7".to_string()));
}

#[test]
fn resolved_alert_closes_ticket_and_second_resolution_is_a_noop() {
    let jira = MockServer::start();
    let comment = jira.mock(|when, then| {
        when.method(POST).path("/rest/api/2/issue/OPS-7/comment");
        then.status(201).json_body(json!({"id": "300"}));
    });
    let transitions = jira.mock(|when, then| {
        when.method(GET).path("/rest/api/2/issue/OPS-7/transitions");
        then.status(200).json_body(json!({"transitions": [
            {"id": "11", "name": "Reopen"},
            {"id": "41", "name": "Close"},
        ]}));
    });
    let transition = jira.mock(|when, then| {
        when.method(POST).path("/rest/api/2/issue/OPS-7/transitions");
        then.status(204);
    });

    let temp = tempfile::tempdir().expect("tempdir");
    let store_path = temp.path().join("incidents.db");
    {
        let store = IncidentStore::open(&store_path).expect("store");
        store.insert(42, "OPS-7").expect("insert");
    }
    let mut config = test_config(&jira.base_url(), &store_path, temp.path());
    config.tracker.close_transition = CloseTransition::Name("Close".to_string());

    let report = run_alert(&config, &invocation(RESOLVED_BODY)).expect("run");
    assert_eq!(report.action, "close");
    assert_eq!(report.ticket_key.as_deref(), Some("OPS-7"));
    assert_eq!(comment.calls(), 1);
    assert_eq!(transitions.calls(), 1);
    assert_eq!(transition.calls(), 1);
    {
        let store = IncidentStore::open(&store_path).expect("store");
        assert_eq!(store.lookup(42).expect("lookup"), None);
    }

    let report = run_alert(&config, &invocation(RESOLVED_BODY)).expect("second run");
    assert_eq!(report.action, "skip");
    assert_eq!(comment.calls(), 1);
    assert_eq!(transition.calls(), 1);
}

#[test]
fn graph_fetch_404_does_not_block_ticket_creation() {
    let jira = MockServer::start();
    let create = jira.mock(|when, then| {
        when.method(POST).path("/rest/api/2/issue");
        then.status(201).json_body(json!({"key": "OPS-8"}));
    });
    let attach = jira.mock(|when, then| {
        when.method(POST).path("/rest/api/2/issue/OPS-8/attachments");
        then.status(200).json_body(json!([]));
    });

    let zabbix = MockServer::start();
    zabbix.mock(|when, then| {
        when.method(POST).path("/");
        then.status(200).header("set-cookie", "zbx_sessionid=abc123");
    });
    zabbix.mock(|when, then| {
        when.method(GET).path("/chart3.php");
        then.status(404);
    });

    let temp = tempfile::tempdir().expect("tempdir");
    let store_path = temp.path().join("incidents.db");
    let mut config = test_config(&jira.base_url(), &store_path, temp.path());
    config.monitor_web = Some(ZabbixWebConfig {
        server: zabbix.base_url(),
        username: "api".to_string(),
        password: "secret".to_string(),
        proxy: None,
        tls_verify: true,
    });

    let body = "zbx;triggerid:42\nzbx;ok:0\nzbx;itemid:1066\nDisk full on host X";
    let report = run_alert(&config, &invocation(body)).expect("run");
    assert_eq!(report.action, "open");
    assert!(!report.graph_attached);
    assert_eq!(create.calls(), 1);
    assert_eq!(attach.calls(), 0);

    let store = IncidentStore::open(&store_path).expect("store");
    assert_eq!(store.lookup(42).expect("lookup"), Some("OPS-8".to_string()));
}

#[test]
fn graph_attachment_and_card_ride_along_on_success() {
    let jira = MockServer::start();
    let create = jira.mock(|when, then| {
        when.method(POST).path("/rest/api/2/issue");
        then.status(201).json_body(json!({"key": "OPS-9"}));
    });
    let attach = jira.mock(|when, then| {
        when.method(POST)
            .path("/rest/api/2/issue/OPS-9/attachments")
            .header("X-Atlassian-Token", "no-check");
        then.status(200).json_body(json!([{"id": "401"}]));
    });

    let zabbix = MockServer::start();
    zabbix.mock(|when, then| {
        when.method(POST).path("/");
        then.status(200).header("set-cookie", "zbx_sessionid=abc123");
    });
    zabbix.mock(|when, then| {
        when.method(GET).path("/chart3.php");
        then.status(200).body("png-bytes");
    });

    let chat = MockServer::start();
    let hook = chat.mock(|when, then| {
        when.method(POST).path("/webhook");
        then.status(200).body("1");
    });

    let temp = tempfile::tempdir().expect("tempdir");
    let store_path = temp.path().join("incidents.db");
    let tmp_dir = temp.path().join("graphs");
    let mut config = test_config(&jira.base_url(), &store_path, &tmp_dir);
    config.monitor_web = Some(ZabbixWebConfig {
        server: zabbix.base_url(),
        username: "api".to_string(),
        password: "secret".to_string(),
        proxy: None,
        tls_verify: true,
    });
    config.webhook = Some(WebhookConfig {
        url: chat.url("/webhook"),
        proxy: None,
    });

    let body =
        "zbx;triggerid:42\nzbx;ok:0\nzbx;itemid:1066\nzbx;title:Disk usage\nDisk full on host X";
    let report = run_alert(&config, &invocation(body)).expect("run");
    assert_eq!(report.action, "open");
    assert!(report.graph_attached);
    assert!(report.notified);
    assert_eq!(create.calls(), 1);
    assert_eq!(attach.calls(), 1);
    assert_eq!(hook.calls(), 1);

    // The downloaded image is scoped to the run; nothing may linger.
    assert!(!tmp_dir.join("1066.png").exists());
}

#[test]
fn problem_alert_for_tracked_trigger_adds_comment_without_duplicating() {
    let jira = MockServer::start();
    let create = jira.mock(|when, then| {
        when.method(POST).path("/rest/api/2/issue");
        then.status(201).json_body(json!({"key": "OPS-99"}));
    });
    let comment = jira.mock(|when, then| {
        when.method(POST).path("/rest/api/2/issue/OPS-7/comment");
        then.status(201).json_body(json!({"id": "301"}));
    });

    let temp = tempfile::tempdir().expect("tempdir");
    let store_path = temp.path().join("incidents.db");
    {
        let store = IncidentStore::open(&store_path).expect("store");
        store.insert(42, "OPS-7").expect("insert");
    }
    let config = test_config(&jira.base_url(), &store_path, temp.path());

    let report = run_alert(&config, &invocation(PROBLEM_BODY)).expect("run");
    assert_eq!(report.action, "comment");
    assert_eq!(report.ticket_key.as_deref(), Some("OPS-7"));
    assert_eq!(create.calls(), 0);
    assert_eq!(comment.calls(), 1);

    let store = IncidentStore::open(&store_path).expect("store");
    assert_eq!(store.lookup(42).expect("lookup"), Some("OPS-7".to_string()));
}

#[test]
fn search_fallback_closes_orphan_tickets() {
    let jira = MockServer::start();
    let search = jira.mock(|when, then| {
        when.method(POST).path("/rest/api/2/search");
        then.status(200)
            .json_body(json!({"issues": [{"key": "OPS-9"}]}));
    });
    let comment = jira.mock(|when, then| {
        when.method(POST).path("/rest/api/2/issue/OPS-9/comment");
        then.status(201).json_body(json!({"id": "302"}));
    });
    let transition = jira.mock(|when, then| {
        when.method(POST).path("/rest/api/2/issue/OPS-9/transitions");
        then.status(204);
    });

    let temp = tempfile::tempdir().expect("tempdir");
    let store_path = temp.path().join("incidents.db");
    let mut config = test_config(&jira.base_url(), &store_path, temp.path());
    config.tracker.search_fallback = true;

    let report = run_alert(&config, &invocation(RESOLVED_BODY)).expect("run");
    assert_eq!(report.action, "close_orphans");
    assert_eq!(report.closed_orphans, vec!["OPS-9".to_string()]);
    assert_eq!(search.calls(), 1);
    assert_eq!(comment.calls(), 1);
    assert_eq!(transition.calls(), 1);
}

#[test]
fn missing_close_transition_aborts_and_keeps_the_row() {
    let jira = MockServer::start();
    jira.mock(|when, then| {
        when.method(POST).path("/rest/api/2/issue/OPS-7/comment");
        then.status(201).json_body(json!({"id": "303"}));
    });
    jira.mock(|when, then| {
        when.method(GET).path("/rest/api/2/issue/OPS-7/transitions");
        then.status(200)
            .json_body(json!({"transitions": [{"id": "11", "name": "Reopen"}]}));
    });

    let temp = tempfile::tempdir().expect("tempdir");
    let store_path = temp.path().join("incidents.db");
    {
        let store = IncidentStore::open(&store_path).expect("store");
        store.insert(42, "OPS-7").expect("insert");
    }
    let mut config = test_config(&jira.base_url(), &store_path, temp.path());
    config.tracker.close_transition = CloseTransition::Name("Close".to_string());

    let error = run_alert(&config, &invocation(RESOLVED_BODY)).expect_err("must fail");
    assert!(error.to_string().contains("no transition named 'Close'"));

    let store = IncidentStore::open(&store_path).expect("store");
    assert_eq!(store.lookup(42).expect("lookup"), Some("OPS-7".to_string()));
}

#[test]
fn malformed_body_fails_before_any_tracker_call() {
    let jira = MockServer::start();
    let create = jira.mock(|when, then| {
        when.method(POST).path("/rest/api/2/issue");
        then.status(201).json_body(json!({"key": "OPS-7"}));
    });

    let temp = tempfile::tempdir().expect("tempdir");
    let store_path = temp.path().join("incidents.db");
    let config = test_config(&jira.base_url(), &store_path, temp.path());

    let error = run_alert(&config, &invocation("zbx;triggerid:forty-two"))
        .expect_err("must fail");
    assert!(error.to_string().contains("failed to parse alert body"));
    assert_eq!(create.calls(), 0);
}

#[test]
fn cli_maps_into_bridge_config() {
    let cli = Cli::try_parse_from([
        "bix-bridge",
        "oncall",
        "Disk full on host X",
        PROBLEM_BODY,
        "901",
        "--tracker-server",
        "https://tracker.example/",
        "--tracker-user",
        "bridge",
        "--tracker-pass",
        "secret",
        "--tracker-project",
        "OPS",
        "--tracker-close-transition",
        "Close",
        "--monitor-server",
        "https://monitor.example",
        "--monitor-web-user",
        "api",
        "--monitor-web-pass",
        "secret",
        "--monitor-tls-verify=false",
    ])
    .expect("parse");

    assert_eq!(cli.event_id, Some(901));
    let config = BridgeConfig::from_cli(&cli).expect("config");
    assert_eq!(config.tracker.server, "https://tracker.example");
    assert_eq!(
        config.tracker.close_transition,
        CloseTransition::Name("Close".to_string())
    );
    let web = config.monitor_web.expect("web config");
    assert_eq!(web.server, "https://monitor.example");
    assert!(!web.tls_verify);
    assert!(config.monitor_rpc.is_none());
    assert!(config.webhook.is_none());
}

#[test]
fn half_configured_web_credentials_are_rejected() {
    let cli = Cli::try_parse_from([
        "bix-bridge",
        "oncall",
        "subject",
        "body",
        "--tracker-server",
        "https://tracker.example",
        "--tracker-user",
        "bridge",
        "--tracker-pass",
        "secret",
        "--tracker-project",
        "OPS",
        "--tracker-close-transition",
        "41",
        "--monitor-server",
        "https://monitor.example",
        "--monitor-web-user",
        "api",
    ])
    .expect("parse");

    let error = BridgeConfig::from_cli(&cli).expect_err("must fail");
    assert!(error.to_string().contains("--monitor-web-pass"));
}

#[test]
fn numeric_close_transition_parses_as_id() {
    assert_eq!(
        CloseTransition::parse("41"),
        CloseTransition::Id("41".to_string())
    );
    assert_eq!(
        CloseTransition::parse("Close"),
        CloseTransition::Name("Close".to_string())
    );
}
