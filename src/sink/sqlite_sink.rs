//! SQLite document sink
//!
//! Documents live in the `statistics` table keyed by `doc_type`; `body` holds
//! the JSON document. The schema is created on connect (idempotent).

use super::{validate_document_type, DocumentSink};
use crate::error::{ConnectionError, ReadError, WriteError};
use crate::supervisor::Connector;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CREATE_STATISTICS_TABLE: &str = "CREATE TABLE IF NOT EXISTS statistics (
    doc_type    TEXT PRIMARY KEY,
    body        TEXT NOT NULL,
    updated_at  INTEGER NOT NULL
)";

pub struct SqliteDocumentSink {
    db_path: PathBuf,
}

impl SqliteDocumentSink {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

#[async_trait]
impl Connector for SqliteDocumentSink {
    type Handle = Connection;

    async fn connect(&self) -> Result<Connection, ConnectionError> {
        if let Some(parent) = self.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&self.db_path)?;
        // Other processes (snapshot_inspect, dashboards) read while we write
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute(CREATE_STATISTICS_TABLE, [])?;
        Ok(conn)
    }

    async fn ping(&self, handle: &mut Connection) -> Result<(), ConnectionError> {
        let one: i64 = handle.query_row("SELECT 1", [], |row| row.get(0))?;
        if one != 1 {
            return Err(ConnectionError::NotAlive(format!("SELECT 1 returned {}", one)));
        }
        Ok(())
    }

    async fn release(&self, handle: Connection) {
        if let Err((_, e)) = handle.close() {
            log::warn!("⚠️  Failed to close SQLite sink {}: {}", self.db_path.display(), e);
        }
    }

    fn backend_type(&self) -> &'static str {
        "SQLite"
    }
}

#[async_trait]
impl DocumentSink for SqliteDocumentSink {
    async fn replace_document(
        &self,
        handle: &mut Connection,
        doc_type: &str,
        document: &Value,
    ) -> Result<(), WriteError> {
        validate_document_type(doc_type)?;
        let body = serde_json::to_string(document)?;

        handle.execute(
            "INSERT INTO statistics (doc_type, body, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(doc_type) DO UPDATE SET
                body = excluded.body,
                updated_at = excluded.updated_at",
            params![doc_type, body, chrono::Utc::now().timestamp()],
        )?;

        Ok(())
    }

    async fn find_document(
        &self,
        handle: &mut Connection,
        doc_type: &str,
    ) -> Result<Option<Value>, ReadError> {
        let body: Option<String> = handle
            .query_row(
                "SELECT body FROM statistics WHERE doc_type = ?1",
                params![doc_type],
                |row| row.get(0),
            )
            .optional()?;

        match body {
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }
}
