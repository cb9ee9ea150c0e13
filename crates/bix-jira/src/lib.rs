//! Issue-tracker REST client used by the alert bridge.

pub mod jira_client;

pub use jira_client::{JiraClient, JiraError, NewIssue, Transition};
