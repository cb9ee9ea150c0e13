//! Webhook delivery for incident cards.

use thiserror::Error;

use crate::card::IncidentCard;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("webhook returned status {status}: {body}")]
    Status { status: u16, body: String },
}

pub struct ChatNotifier {
    http: reqwest::blocking::Client,
    webhook_url: String,
}

impl ChatNotifier {
    pub fn new(webhook_url: &str, proxy: Option<&str>) -> Result<Self, NotifyError> {
        let mut builder = reqwest::blocking::Client::builder();
        if let Some(proxy) = proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        Ok(Self {
            http: builder.build()?,
            webhook_url: webhook_url.to_string(),
        })
    }

    pub fn post_card(&self, card: &IncidentCard) -> Result<(), NotifyError> {
        let response = self.http.post(&self.webhook_url).json(card).send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
