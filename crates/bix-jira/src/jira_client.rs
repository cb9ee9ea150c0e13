//! Blocking REST client for the issue tracker.
//!
//! One authenticated handle is constructed at process start and reused for
//! every call; credentials ride along as basic auth on each request.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

const ERROR_BODY_LIMIT: usize = 800;

#[derive(Debug, Error)]
pub enum JiraError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("tracker {operation} failed with status {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },
    #[error("no transition named '{name}' available on {issue}")]
    TransitionNotFound { issue: String, name: String },
    #[error("attachment i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fields for a ticket to be created.
#[derive(Debug, Clone)]
pub struct NewIssue {
    pub project: String,
    pub summary: String,
    pub description: String,
    pub issue_type: String,
    pub assignee: String,
    pub priority_id: String,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Transition {
    pub id: String,
    pub name: String,
}

pub struct JiraClient {
    http: reqwest::blocking::Client,
    server: String,
    user: String,
    pass: String,
}

impl JiraClient {
    pub fn new(server: &str, user: &str, pass: &str) -> Result<Self, JiraError> {
        let http = reqwest::blocking::Client::builder().build()?;
        Ok(Self {
            http,
            server: server.trim_end_matches('/').to_string(),
            user: user.to_string(),
            pass: pass.to_string(),
        })
    }

    /// Creates a ticket and returns its key.
    pub fn create_issue(&self, issue: &NewIssue) -> Result<String, JiraError> {
        #[derive(Deserialize)]
        struct Created {
            key: String,
        }

        let payload = json!({
            "fields": {
                "project": { "key": issue.project },
                "summary": issue.summary,
                "description": issue.description,
                "issuetype": { "name": issue.issue_type },
                "assignee": { "name": issue.assignee },
                "priority": { "id": issue.priority_id },
                "labels": issue.labels,
            }
        });
        let created: Created = self.request_json(
            "create issue",
            self.http
                .post(format!("{}/rest/api/2/issue", self.server))
                .json(&payload),
        )?;
        Ok(created.key)
    }

    pub fn add_comment(&self, issue: &str, text: &str) -> Result<(), JiraError> {
        let payload = json!({ "body": text });
        self.request_ok(
            "add comment",
            self.http
                .post(format!("{}/rest/api/2/issue/{issue}/comment", self.server))
                .json(&payload),
        )
    }

    /// Uploads a file as a ticket attachment.
    pub fn add_attachment(&self, issue: &str, file: &Path) -> Result<(), JiraError> {
        let form = reqwest::blocking::multipart::Form::new().file("file", file)?;
        self.request_ok(
            "add attachment",
            self.http
                .post(format!("{}/rest/api/2/issue/{issue}/attachments", self.server))
                .header("X-Atlassian-Token", "no-check")
                .multipart(form),
        )
    }

    /// Transitions currently available on the ticket.
    pub fn transitions(&self, issue: &str) -> Result<Vec<Transition>, JiraError> {
        #[derive(Deserialize)]
        struct TransitionList {
            transitions: Vec<Transition>,
        }

        let list: TransitionList = self.request_json(
            "list transitions",
            self.http
                .get(format!("{}/rest/api/2/issue/{issue}/transitions", self.server)),
        )?;
        Ok(list.transitions)
    }

    /// Resolves a transition id from its display name. The tracker offering
    /// no matching transition is an error, never a silent no-op.
    pub fn resolve_transition_id(&self, issue: &str, name: &str) -> Result<String, JiraError> {
        let transitions = self.transitions(issue)?;
        transitions
            .into_iter()
            .find(|transition| transition.name == name)
            .map(|transition| transition.id)
            .ok_or_else(|| JiraError::TransitionNotFound {
                issue: issue.to_string(),
                name: name.to_string(),
            })
    }

    pub fn transition_issue(&self, issue: &str, transition_id: &str) -> Result<(), JiraError> {
        let payload = json!({ "transition": { "id": transition_id } });
        self.request_ok(
            "transition issue",
            self.http
                .post(format!("{}/rest/api/2/issue/{issue}/transitions", self.server))
                .json(&payload),
        )
    }

    /// Keys of unresolved tickets carrying the label.
    pub fn search_open_issues(&self, label: &str) -> Result<Vec<String>, JiraError> {
        #[derive(Deserialize)]
        struct IssueRef {
            key: String,
        }
        #[derive(Deserialize)]
        struct SearchResult {
            issues: Vec<IssueRef>,
        }

        let payload = json!({
            "jql": format!("labels = \"{label}\" AND resolution = Unresolved"),
            "fields": ["key"],
        });
        let result: SearchResult = self.request_json(
            "search issues",
            self.http
                .post(format!("{}/rest/api/2/search", self.server))
                .json(&payload),
        )?;
        Ok(result.issues.into_iter().map(|issue| issue.key).collect())
    }

    fn request_json<T>(
        &self,
        operation: &'static str,
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<T, JiraError>
    where
        T: DeserializeOwned,
    {
        let response = request
            .basic_auth(&self.user, Some(&self.pass))
            .send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(JiraError::Status {
                operation,
                status: status.as_u16(),
                body: truncate_for_error(&body, ERROR_BODY_LIMIT),
            });
        }
        Ok(response.json::<T>()?)
    }

    fn request_ok(
        &self,
        operation: &'static str,
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<(), JiraError> {
        let response = request
            .basic_auth(&self.user, Some(&self.pass))
            .send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(JiraError::Status {
                operation,
                status: status.as_u16(),
                body: truncate_for_error(&body, ERROR_BODY_LIMIT),
            });
        }
        Ok(())
    }
}

fn truncate_for_error(body: &str, limit: usize) -> String {
    if body.chars().count() <= limit {
        return body.to_string();
    }
    let truncated: String = body.chars().take(limit).collect();
    format!("{truncated}…")
}
