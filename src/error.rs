//! Error taxonomy for the aggregation loop
//!
//! Each backend-facing boundary owns one error type:
//! - `ConnectionError` - cannot establish or verify a connection within the retry budget
//! - `ReadError` - the extraction query failed (the cycle ends as `ReadFailed`)
//! - `WriteError` - the snapshot upsert failed (the publisher turns this into `false`)
//!
//! An empty batch is not an error anywhere in this crate.

use std::fmt;

#[derive(Debug)]
pub enum ConnectionError {
    Sqlite(rusqlite::Error),
    MySql(sqlx::Error),
    Mongo(mongodb::error::Error),
    Io(std::io::Error),
    /// Connected, but the liveness check did not pass
    NotAlive(String),
    /// Backend refused or is unreachable for a reason without a driver error
    Unavailable(String),
    RetriesExhausted {
        backend: &'static str,
        attempts: u32,
        last: Box<ConnectionError>,
    },
}

impl From<rusqlite::Error> for ConnectionError {
    fn from(err: rusqlite::Error) -> Self {
        ConnectionError::Sqlite(err)
    }
}

impl From<sqlx::Error> for ConnectionError {
    fn from(err: sqlx::Error) -> Self {
        ConnectionError::MySql(err)
    }
}

impl From<mongodb::error::Error> for ConnectionError {
    fn from(err: mongodb::error::Error) -> Self {
        ConnectionError::Mongo(err)
    }
}

impl From<std::io::Error> for ConnectionError {
    fn from(err: std::io::Error) -> Self {
        ConnectionError::Io(err)
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::Sqlite(e) => write!(f, "SQLite connection error: {}", e),
            ConnectionError::MySql(e) => write!(f, "MySQL connection error: {}", e),
            ConnectionError::Mongo(e) => write!(f, "MongoDB connection error: {}", e),
            ConnectionError::Io(e) => write!(f, "IO error: {}", e),
            ConnectionError::NotAlive(msg) => write!(f, "Liveness check failed: {}", msg),
            ConnectionError::Unavailable(msg) => write!(f, "Backend unavailable: {}", msg),
            ConnectionError::RetriesExhausted { backend, attempts, last } => write!(
                f,
                "{} unreachable after {} attempts: {}",
                backend, attempts, last
            ),
        }
    }
}

impl std::error::Error for ConnectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConnectionError::Sqlite(e) => Some(e),
            ConnectionError::MySql(e) => Some(e),
            ConnectionError::Mongo(e) => Some(e),
            ConnectionError::Io(e) => Some(e),
            ConnectionError::RetriesExhausted { last, .. } => Some(last.as_ref()),
            ConnectionError::NotAlive(_) | ConnectionError::Unavailable(_) => None,
        }
    }
}

#[derive(Debug)]
pub enum ReadError {
    Sqlite(rusqlite::Error),
    MySql(sqlx::Error),
    Mongo(mongodb::error::Error),
    Io(std::io::Error),
    Serialization(serde_json::Error),
    Backend(String),
}

impl From<rusqlite::Error> for ReadError {
    fn from(err: rusqlite::Error) -> Self {
        ReadError::Sqlite(err)
    }
}

impl From<sqlx::Error> for ReadError {
    fn from(err: sqlx::Error) -> Self {
        ReadError::MySql(err)
    }
}

impl From<mongodb::error::Error> for ReadError {
    fn from(err: mongodb::error::Error) -> Self {
        ReadError::Mongo(err)
    }
}

impl From<std::io::Error> for ReadError {
    fn from(err: std::io::Error) -> Self {
        ReadError::Io(err)
    }
}

impl From<serde_json::Error> for ReadError {
    fn from(err: serde_json::Error) -> Self {
        ReadError::Serialization(err)
    }
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::Sqlite(e) => write!(f, "SQLite read error: {}", e),
            ReadError::MySql(e) => write!(f, "MySQL read error: {}", e),
            ReadError::Mongo(e) => write!(f, "MongoDB read error: {}", e),
            ReadError::Io(e) => write!(f, "IO error: {}", e),
            ReadError::Serialization(e) => write!(f, "Serialization error: {}", e),
            ReadError::Backend(msg) => write!(f, "Backend error: {}", msg),
        }
    }
}

impl std::error::Error for ReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReadError::Sqlite(e) => Some(e),
            ReadError::MySql(e) => Some(e),
            ReadError::Mongo(e) => Some(e),
            ReadError::Io(e) => Some(e),
            ReadError::Serialization(e) => Some(e),
            ReadError::Backend(_) => None,
        }
    }
}

#[derive(Debug)]
pub enum WriteError {
    Sqlite(rusqlite::Error),
    Mongo(mongodb::error::Error),
    Io(std::io::Error),
    Serialization(serde_json::Error),
    Bson(mongodb::bson::ser::Error),
    InvalidDocumentType(String),
    Backend(String),
}

impl From<rusqlite::Error> for WriteError {
    fn from(err: rusqlite::Error) -> Self {
        WriteError::Sqlite(err)
    }
}

impl From<mongodb::error::Error> for WriteError {
    fn from(err: mongodb::error::Error) -> Self {
        WriteError::Mongo(err)
    }
}

impl From<mongodb::bson::ser::Error> for WriteError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        WriteError::Bson(err)
    }
}

impl From<std::io::Error> for WriteError {
    fn from(err: std::io::Error) -> Self {
        WriteError::Io(err)
    }
}

impl From<serde_json::Error> for WriteError {
    fn from(err: serde_json::Error) -> Self {
        WriteError::Serialization(err)
    }
}

impl From<tempfile::PersistError> for WriteError {
    fn from(err: tempfile::PersistError) -> Self {
        WriteError::Io(err.error)
    }
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteError::Sqlite(e) => write!(f, "SQLite write error: {}", e),
            WriteError::Mongo(e) => write!(f, "MongoDB write error: {}", e),
            WriteError::Io(e) => write!(f, "IO error: {}", e),
            WriteError::Serialization(e) => write!(f, "Serialization error: {}", e),
            WriteError::Bson(e) => write!(f, "BSON serialization error: {}", e),
            WriteError::InvalidDocumentType(t) => write!(f, "Invalid document type: {}", t),
            WriteError::Backend(msg) => write!(f, "Backend error: {}", msg),
        }
    }
}

impl std::error::Error for WriteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WriteError::Sqlite(e) => Some(e),
            WriteError::Mongo(e) => Some(e),
            WriteError::Io(e) => Some(e),
            WriteError::Serialization(e) => Some(e),
            WriteError::Bson(e) => Some(e),
            WriteError::InvalidDocumentType(_) | WriteError::Backend(_) => None,
        }
    }
}
