//! Parser for the prefixed key-value settings embedded in alert bodies.
//!
//! Alert actions embed machine-readable settings as lines carrying a prefix
//! token (`zbx;triggerid:42`). Everything else in the body is free text for a
//! human reader and passes through untouched, in order.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::alert_severity::Severity;

const DEFAULT_GRAPH_PERIOD: i64 = 3_600;
const DEFAULT_GRAPH_WIDTH: i64 = 900;
const DEFAULT_GRAPH_HEIGHT: i64 = 200;

static SETTING_SPLITTER: OnceLock<Regex> = OnceLock::new();

fn setting_splitter() -> &'static Regex {
    SETTING_SPLITTER
        .get_or_init(|| Regex::new(r"[\s:=]+").expect("setting splitter pattern is valid"))
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AlertParseError {
    #[error("malformed setting '{key}': expected an integer, got '{value}'")]
    MalformedSetting { key: String, value: String },
}

/// Raw value of a settings line before coercion. A key with no value is a
/// presence flag.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RawValue {
    Text(String),
    Present,
}

/// Graph rendering parameters carried in the alert body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphSettings {
    pub enabled: bool,
    pub item_id: i64,
    pub period: i64,
    pub title: Option<String>,
    pub width: i64,
    pub height: i64,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            item_id: 0,
            period: DEFAULT_GRAPH_PERIOD,
            title: None,
            width: DEFAULT_GRAPH_WIDTH,
            height: DEFAULT_GRAPH_HEIGHT,
        }
    }
}

/// One alert notification, split into typed settings and the remaining
/// human-readable message lines (original order preserved).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAlert {
    pub trigger_id: i64,
    pub event_id: Option<i64>,
    pub resolved: bool,
    pub severity: Severity,
    pub graph: GraphSettings,
    pub message_lines: Vec<String>,
    /// Recognized-prefix lines whose key is not in the settings table. Dropped
    /// from the settings, surfaced here so callers and tests can observe the
    /// drop.
    pub ignored: Vec<String>,
}

impl ParsedAlert {
    pub fn message(&self) -> String {
        self.message_lines.join("\n")
    }

    /// Whether the alert asks for a rendered graph: either the explicit
    /// `graphs` flag or a concrete item id.
    pub fn wants_graph(&self) -> bool {
        self.graph.enabled || self.graph.item_id != 0
    }
}

#[derive(Debug, Default)]
struct RawSettings {
    item_id: Option<RawValue>,
    trigger_id: Option<RawValue>,
    event_id: Option<RawValue>,
    ok: Option<RawValue>,
    priority: Option<RawValue>,
    title: Option<RawValue>,
    graphs_period: Option<RawValue>,
    graphs_width: Option<RawValue>,
    graphs_height: Option<RawValue>,
    graphs: Option<RawValue>,
}

/// Splits prefixed settings lines out of a raw alert body.
#[derive(Debug, Clone)]
pub struct AlertParser {
    prefix: String,
    key_marker: String,
}

impl AlertParser {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            key_marker: format!("{prefix};"),
        }
    }

    pub fn parse(&self, body: &str) -> Result<ParsedAlert, AlertParseError> {
        let mut raw = RawSettings::default();
        let mut message_lines = Vec::new();
        let mut ignored = Vec::new();

        for line in body.lines() {
            if !line.contains(&self.prefix) {
                message_lines.push(line.to_string());
                continue;
            }

            let mut parts = setting_splitter().splitn(line, 2);
            let key_part = parts.next().unwrap_or_default();
            let key = key_part.replace(&self.key_marker, "");
            let value = match parts.next() {
                Some(value) if !value.is_empty() => RawValue::Text(value.to_string()),
                _ => RawValue::Present,
            };

            let slot = match key.as_str() {
                "itemid" => &mut raw.item_id,
                "triggerid" => &mut raw.trigger_id,
                "eventid" => &mut raw.event_id,
                "ok" => &mut raw.ok,
                "priority" => &mut raw.priority,
                "title" => &mut raw.title,
                "graphs_period" => &mut raw.graphs_period,
                "graphs_width" => &mut raw.graphs_width,
                "graphs_height" => &mut raw.graphs_height,
                "graphs" => &mut raw.graphs,
                _ => {
                    debug!("ignoring unrecognized alert setting '{key}'");
                    ignored.push(key);
                    continue;
                }
            };
            *slot = Some(value);
        }

        let trigger_id = coerce_int("triggerid", raw.trigger_id.as_ref(), 0)?;
        let event_id = match raw.event_id.as_ref() {
            Some(value) => Some(coerce_int("eventid", Some(value), 0)?),
            None => None,
        };
        let resolved = coerce_int("ok", raw.ok.as_ref(), 0)? != 0;
        let severity = coerce_text(raw.priority)
            .as_deref()
            .and_then(Severity::from_label)
            .unwrap_or_default();
        let graph = GraphSettings {
            enabled: raw.graphs.is_some(),
            item_id: coerce_int("itemid", raw.item_id.as_ref(), 0)?,
            period: coerce_int("graphs_period", raw.graphs_period.as_ref(), DEFAULT_GRAPH_PERIOD)?,
            title: coerce_text(raw.title),
            width: coerce_int("graphs_width", raw.graphs_width.as_ref(), DEFAULT_GRAPH_WIDTH)?,
            height: coerce_int(
                "graphs_height",
                raw.graphs_height.as_ref(),
                DEFAULT_GRAPH_HEIGHT,
            )?,
        };

        Ok(ParsedAlert {
            trigger_id,
            event_id,
            resolved,
            severity,
            graph,
            message_lines,
            ignored,
        })
    }
}

fn coerce_int(key: &str, value: Option<&RawValue>, default: i64) -> Result<i64, AlertParseError> {
    match value {
        None => Ok(default),
        Some(RawValue::Present) => Ok(1),
        Some(RawValue::Text(text)) => {
            text.trim()
                .parse::<i64>()
                .map_err(|_| AlertParseError::MalformedSetting {
                    key: key.to_string(),
                    value: text.clone(),
                })
        }
    }
}

fn coerce_text(value: Option<RawValue>) -> Option<String> {
    match value {
        Some(RawValue::Text(text)) => Some(text),
        Some(RawValue::Present) | None => None,
    }
}
