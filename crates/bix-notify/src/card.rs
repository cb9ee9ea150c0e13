//! Structured card payload posted to the chat webhook.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Serialize;

use bix_alert::Severity;

const RESOLVED_COLOR: &str = "59db8f";

/// Incident summary card in the connector MessageCard shape.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentCard {
    #[serde(rename = "@type")]
    card_type: &'static str,
    #[serde(rename = "@context")]
    context: &'static str,
    summary: String,
    theme_color: String,
    title: String,
    sections: Vec<CardSection>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    potential_action: Vec<CardAction>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct CardSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    facts: Vec<CardFact>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<CardImage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CardFact {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
struct CardImage {
    image: String,
}

#[derive(Debug, Clone, Serialize)]
struct CardAction {
    #[serde(rename = "@type")]
    action_type: &'static str,
    name: String,
    targets: Vec<ActionTarget>,
}

#[derive(Debug, Clone, Serialize)]
struct ActionTarget {
    os: &'static str,
    uri: String,
}

impl IncidentCard {
    pub fn new(title: &str, severity: Severity, resolved: bool) -> Self {
        Self {
            card_type: "MessageCard",
            context: "http://schema.org/extensions",
            summary: title.to_string(),
            theme_color: theme_color(severity, resolved).to_string(),
            title: title.to_string(),
            sections: vec![CardSection {
                text: None,
                facts: Vec::new(),
                images: Vec::new(),
            }],
            potential_action: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.sections[0].text = Some(text.to_string());
        self
    }

    pub fn with_fact(mut self, name: &str, value: &str) -> Self {
        self.sections[0].facts.push(CardFact {
            name: name.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn with_link(mut self, name: &str, uri: &str) -> Self {
        self.potential_action.push(CardAction {
            action_type: "OpenUri",
            name: name.to_string(),
            targets: vec![ActionTarget {
                os: "default",
                uri: uri.to_string(),
            }],
        });
        self
    }

    /// Embeds a PNG as an inline data-URI image section.
    pub fn with_png(mut self, bytes: &[u8]) -> Self {
        self.sections.push(CardSection {
            text: None,
            facts: Vec::new(),
            images: vec![CardImage {
                image: format!("data:image/png;base64,{}", BASE64.encode(bytes)),
            }],
        });
        self
    }
}

/// Theme color keyed to severity; resolution always renders green.
pub fn theme_color(severity: Severity, resolved: bool) -> &'static str {
    if resolved {
        return RESOLVED_COLOR;
    }
    match severity {
        Severity::NotClassified => "97aab3",
        Severity::Information => "7499ff",
        Severity::Warning => "ffc859",
        Severity::Average => "ffa059",
        Severity::High => "e97659",
        Severity::Disaster => "e45959",
    }
}
