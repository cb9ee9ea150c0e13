//! Alert-to-ticket reconciliation.
//!
//! Each invocation parses one alert notification, consults the tracked
//! incidents, and performs exactly one primary action: open a ticket, close
//! one, comment on one, or skip. Graph attachment, the chat card, and event
//! acknowledgement are best-effort side channels; their failure never blocks
//! the primary action or the store update.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use bix_alert::{AlertParser, ParsedAlert};
use bix_jira::{JiraClient, JiraError, NewIssue};
use bix_notify::{ChatNotifier, IncidentCard};
use bix_store::IncidentStore;
use bix_zabbix::{GraphRequest, ZabbixRpcClient, ZabbixWebSession};

use crate::bridge_config::{BridgeConfig, CloseTransition};

/// Positional inputs of one invocation.
#[derive(Debug, Clone)]
pub struct AlertInvocation {
    pub assignee: String,
    pub subject: String,
    pub body: String,
    pub event_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileDecision {
    /// No tracked row, problem alert: create a ticket and start tracking.
    OpenTicket,
    /// No tracked row, resolved alert: nothing to close.
    SkipUntracked,
    /// Tracked row, resolved alert: comment, transition to closed, untrack.
    CloseTicket { ticket_key: String },
    /// Tracked row, problem alert: append the new alert as a comment. A
    /// tracked trigger never gets a second ticket and a problem alert never
    /// closes one.
    CommentExisting { ticket_key: String },
}

pub fn decide(tracked: Option<String>, resolved: bool) -> ReconcileDecision {
    match (tracked, resolved) {
        (None, false) => ReconcileDecision::OpenTicket,
        (None, true) => ReconcileDecision::SkipUntracked,
        (Some(ticket_key), true) => ReconcileDecision::CloseTicket { ticket_key },
        (Some(ticket_key), false) => ReconcileDecision::CommentExisting { ticket_key },
    }
}

/// Outcome summary of one invocation, printed as JSON for the operator.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub action: String,
    pub trigger_id: i64,
    pub ticket_key: Option<String>,
    pub graph_attached: bool,
    pub notified: bool,
    pub event_acknowledged: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub closed_orphans: Vec<String>,
}

impl RunReport {
    fn new(action: &str, trigger_id: i64) -> Self {
        Self {
            action: action.to_string(),
            trigger_id,
            ticket_key: None,
            graph_attached: false,
            notified: false,
            event_acknowledged: false,
            closed_orphans: Vec::new(),
        }
    }
}

pub fn run_alert(config: &BridgeConfig, invocation: &AlertInvocation) -> Result<RunReport> {
    let parser = AlertParser::new(&config.alert_prefix);
    let alert = parser
        .parse(&invocation.body)
        .context("failed to parse alert body")?;
    for key in &alert.ignored {
        warn!("alert body carried unrecognized setting '{key}'");
    }

    let store = IncidentStore::open(&config.store_path)?;
    let jira = JiraClient::new(
        &config.tracker.server,
        &config.tracker.user,
        &config.tracker.pass,
    )?;

    let tracked = store.lookup(alert.trigger_id)?;
    match decide(tracked, alert.resolved) {
        ReconcileDecision::OpenTicket => open_ticket(config, invocation, &alert, &store, &jira),
        ReconcileDecision::SkipUntracked => skip_untracked(config, &alert, &jira),
        ReconcileDecision::CloseTicket { ticket_key } => {
            close_ticket(config, invocation, &alert, &store, &jira, &ticket_key)
        }
        ReconcileDecision::CommentExisting { ticket_key } => {
            jira.add_comment(&ticket_key, &alert.message())?;
            info!(
                "trigger {} is already tracked as {ticket_key}; alert appended as comment",
                alert.trigger_id
            );
            let mut report = RunReport::new("comment", alert.trigger_id);
            report.ticket_key = Some(ticket_key);
            Ok(report)
        }
    }
}

fn open_ticket(
    config: &BridgeConfig,
    invocation: &AlertInvocation,
    alert: &ParsedAlert,
    store: &IncidentStore,
    jira: &JiraClient,
) -> Result<RunReport> {
    let issue = NewIssue {
        project: config.tracker.project.clone(),
        summary: invocation.subject.clone(),
        description: alert.message(),
        issue_type: config.tracker.issue_type.clone(),
        assignee: invocation.assignee.clone(),
        priority_id: alert.severity.priority_id().to_string(),
        labels: vec![trigger_label(alert.trigger_id)],
    };
    let ticket_key = jira.create_issue(&issue)?;
    info!("created ticket {ticket_key} for trigger {}", alert.trigger_id);

    let graph_png = attach_graph(config, alert, jira, &ticket_key);
    let notified = notify(
        config,
        invocation,
        alert,
        &ticket_key,
        graph_png.as_deref(),
        false,
    );
    let event_acknowledged = acknowledge_event(config, invocation, alert, &ticket_key);

    store.insert(alert.trigger_id, &ticket_key)?;

    let mut report = RunReport::new("open", alert.trigger_id);
    report.ticket_key = Some(ticket_key);
    report.graph_attached = graph_png.is_some();
    report.notified = notified;
    report.event_acknowledged = event_acknowledged;
    Ok(report)
}

fn close_ticket(
    config: &BridgeConfig,
    invocation: &AlertInvocation,
    alert: &ParsedAlert,
    store: &IncidentStore,
    jira: &JiraClient,
    ticket_key: &str,
) -> Result<RunReport> {
    jira.add_comment(ticket_key, &alert.message())?;
    let transition_id = resolve_close_transition(config, jira, ticket_key)?;
    jira.transition_issue(ticket_key, &transition_id)?;
    store.delete(alert.trigger_id)?;
    info!("closed ticket {ticket_key} for trigger {}", alert.trigger_id);

    let notified = notify(config, invocation, alert, ticket_key, None, true);

    let mut report = RunReport::new("close", alert.trigger_id);
    report.ticket_key = Some(ticket_key.to_string());
    report.notified = notified;
    Ok(report)
}

fn skip_untracked(
    config: &BridgeConfig,
    alert: &ParsedAlert,
    jira: &JiraClient,
) -> Result<RunReport> {
    if !config.tracker.search_fallback {
        info!(
            "no tracked ticket for trigger {}; nothing to close",
            alert.trigger_id
        );
        return Ok(RunReport::new("skip", alert.trigger_id));
    }

    // Recovery for orphan tickets: created upstream but never recorded
    // locally, findable through their trigger label.
    let orphans = jira.search_open_issues(&trigger_label(alert.trigger_id))?;
    for ticket_key in &orphans {
        jira.add_comment(ticket_key, &alert.message())?;
        let transition_id = resolve_close_transition(config, jira, ticket_key)?;
        jira.transition_issue(ticket_key, &transition_id)?;
        info!("closed orphan ticket {ticket_key} for trigger {}", alert.trigger_id);
    }

    let mut report = RunReport::new(
        if orphans.is_empty() { "skip" } else { "close_orphans" },
        alert.trigger_id,
    );
    report.closed_orphans = orphans;
    Ok(report)
}

pub(crate) fn trigger_label(trigger_id: i64) -> String {
    format!("bix-trigger-{trigger_id}")
}

fn resolve_close_transition(
    config: &BridgeConfig,
    jira: &JiraClient,
    ticket_key: &str,
) -> Result<String, JiraError> {
    match &config.tracker.close_transition {
        CloseTransition::Id(id) => Ok(id.clone()),
        CloseTransition::Name(name) => jira.resolve_transition_id(ticket_key, name),
    }
}

/// Downloads and attaches the rendered graph. Returns the image bytes so the
/// chat card can embed them. Any failure is logged and swallowed.
fn attach_graph(
    config: &BridgeConfig,
    alert: &ParsedAlert,
    jira: &JiraClient,
    ticket_key: &str,
) -> Option<Vec<u8>> {
    let web_config = config.monitor_web.as_ref()?;
    if !alert.wants_graph() {
        return None;
    }

    let result = (|| -> Result<Vec<u8>> {
        let mut session = ZabbixWebSession::new(web_config)?;
        session.login()?;
        let request = GraphRequest {
            item_id: alert.graph.item_id,
            period: alert.graph.period,
            title: alert.graph.title.clone().unwrap_or_default(),
            width: alert.graph.width,
            height: alert.graph.height,
        };
        let image = session.fetch_graph(&request, &config.tmp_dir)?;
        let bytes = std::fs::read(image.path())?;
        jira.add_attachment(ticket_key, image.path())?;
        Ok(bytes)
    })();

    match result {
        Ok(bytes) => Some(bytes),
        Err(error) => {
            warn!("graph attachment for {ticket_key} skipped: {error:#}");
            None
        }
    }
}

/// Posts the incident card when a webhook is configured. Failures are logged
/// and swallowed.
fn notify(
    config: &BridgeConfig,
    invocation: &AlertInvocation,
    alert: &ParsedAlert,
    ticket_key: &str,
    graph_png: Option<&[u8]>,
    resolved: bool,
) -> bool {
    let Some(webhook) = config.webhook.as_ref() else {
        return false;
    };

    let result = (|| -> Result<()> {
        let notifier = ChatNotifier::new(&webhook.url, webhook.proxy.as_deref())?;
        let title = if resolved {
            format!("Resolved: {}", invocation.subject)
        } else {
            invocation.subject.clone()
        };
        let mut card = IncidentCard::new(&title, alert.severity, resolved)
            .with_text(&alert.message())
            .with_fact("Trigger", &alert.trigger_id.to_string())
            .with_fact("Severity", alert.severity.label())
            .with_fact("Ticket", ticket_key)
            .with_link(
                "Open ticket",
                &format!("{}/browse/{ticket_key}", config.tracker.server),
            );
        if let Some(bytes) = graph_png {
            card = card.with_png(bytes);
        }
        notifier.post_card(&card)?;
        Ok(())
    })();

    match result {
        Ok(()) => true,
        Err(error) => {
            warn!("chat notification for {ticket_key} skipped: {error:#}");
            false
        }
    }
}

/// Acknowledges the originating monitoring event with the ticket key, when
/// RPC credentials and an event id are available. Failures are logged and
/// swallowed.
fn acknowledge_event(
    config: &BridgeConfig,
    invocation: &AlertInvocation,
    alert: &ParsedAlert,
    ticket_key: &str,
) -> bool {
    let Some(rpc_config) = config.monitor_rpc.as_ref() else {
        return false;
    };
    let Some(event_id) = invocation.event_id.or(alert.event_id) else {
        return false;
    };

    let result = (|| -> Result<()> {
        let mut rpc = ZabbixRpcClient::new(rpc_config)?;
        rpc.login()?;
        rpc.get_event(event_id)?;
        rpc.acknowledge_event(event_id, &format!("Ticket {ticket_key} created"))?;
        Ok(())
    })();

    match result {
        Ok(()) => true,
        Err(error) => {
            warn!("event {event_id} acknowledgement skipped: {error:#}");
            false
        }
    }
}
