//! SQLite data point source
//!
//! Opens the database file read-only, so a missing file is a connection
//! error rather than a silently created empty database.

use super::{DataPointSample, DataSource, SELECT_DATA_POINTS};
use crate::error::{ConnectionError, ReadError};
use crate::supervisor::Connector;
use async_trait::async_trait;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};

pub struct SqliteDataSource {
    db_path: PathBuf,
}

impl SqliteDataSource {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

fn read_rows(conn: &Connection) -> rusqlite::Result<Vec<DataPointSample>> {
    let mut stmt = conn.prepare(SELECT_DATA_POINTS)?;
    let rows = stmt.query_map([], |row| {
        Ok(DataPointSample {
            min: row.get(0)?,
            max: row.get(1)?,
        })
    })?;

    rows.collect()
}

#[async_trait]
impl Connector for SqliteDataSource {
    type Handle = Connection;

    async fn connect(&self) -> Result<Connection, ConnectionError> {
        let conn = Connection::open_with_flags(
            &self.db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
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
            log::warn!("⚠️  Failed to close SQLite source {}: {}", self.db_path.display(), e);
        }
    }

    fn backend_type(&self) -> &'static str {
        "SQLite"
    }
}

#[async_trait]
impl DataSource for SqliteDataSource {
    async fn read_samples(
        &self,
        handle: &mut Connection,
    ) -> Result<Vec<DataPointSample>, ReadError> {
        Ok(read_rows(handle)?)
    }
}
