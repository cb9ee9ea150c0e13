//! SQLite persistence for tracked incidents.
//!
//! One row per monitoring trigger that currently has an open ticket. The
//! store is the single source of truth for "is this alert already ticketed":
//! rows are inserted only after a ticket was created and deleted only after
//! the close calls returned. There is no cross-process locking beyond
//! SQLite's own; two concurrent invocations for the same trigger can both
//! observe an empty row and create duplicate tickets. That race is accepted.

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

pub struct IncidentStore {
    connection: Connection,
}

impl IncidentStore {
    /// Opens the store, creating the parent directory and schema when absent.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create incident store directory {}", parent.display())
                })?;
            }
        }
        let connection = Connection::open(path)
            .with_context(|| format!("failed to open incident store {}", path.display()))?;
        connection.busy_timeout(Duration::from_secs(5))?;
        connection.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            "#,
        )?;
        initialize_schema(&connection)?;
        Ok(Self { connection })
    }

    /// Ticket key tracked for the trigger, if any.
    pub fn lookup(&self, trigger_id: i64) -> Result<Option<String>> {
        self.connection
            .query_row(
                "SELECT ticket_key FROM incidents WHERE trigger_id = ?1",
                params![trigger_id],
                |row| row.get(0),
            )
            .optional()
            .context("failed to look up tracked incident")
    }

    /// Records a freshly ticketed trigger. The primary key keeps at most one
    /// open incident per trigger id.
    pub fn insert(&self, trigger_id: i64, ticket_key: &str) -> Result<()> {
        self.connection
            .execute(
                "INSERT INTO incidents (trigger_id, ticket_key) VALUES (?1, ?2)",
                params![trigger_id, ticket_key],
            )
            .context("failed to insert tracked incident")?;
        Ok(())
    }

    /// Removes the tracked row. Returns whether a row existed.
    pub fn delete(&self, trigger_id: i64) -> Result<bool> {
        let removed = self
            .connection
            .execute(
                "DELETE FROM incidents WHERE trigger_id = ?1",
                params![trigger_id],
            )
            .context("failed to delete tracked incident")?;
        Ok(removed > 0)
    }
}

fn initialize_schema(connection: &Connection) -> Result<()> {
    connection.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS incidents (
            trigger_id INTEGER PRIMARY KEY,
            ticket_key TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}
