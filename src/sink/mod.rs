//! Snapshot publisher - idempotent upsert of the current statistics document
//!
//! The snapshot is stored under the fixed document type `descriptive_statistics`.
//! Each publish replaces the whole document (insert if absent), so the store
//! never holds more than one snapshot and keeps no history.
//!
//! Backends:
//! - `SqliteDocumentSink` - one row per document type, `ON CONFLICT DO UPDATE`
//! - `JsonDocumentSink` - one `<type>.json` file per document type, atomic rename
//! - `MongoDocumentSink` - `replace_one` with upsert, filtered on `type`

pub mod json_sink;
pub mod mongo_sink;
pub mod sqlite_sink;

pub use json_sink::JsonDocumentSink;
pub use mongo_sink::MongoDocumentSink;
pub use sqlite_sink::SqliteDocumentSink;

use crate::error::{ReadError, WriteError};
use crate::stats::StatisticsSnapshot;
use crate::supervisor::Connector;
use async_trait::async_trait;
use serde_json::Value;

/// Logical key of the snapshot document
pub const SNAPSHOT_DOCUMENT_TYPE: &str = "descriptive_statistics";

/// Document collection supporting replace-by-type
#[async_trait]
pub trait DocumentSink: Connector {
    /// Replace the document of `doc_type` with `document`, inserting it if absent
    async fn replace_document(
        &self,
        handle: &mut Self::Handle,
        doc_type: &str,
        document: &Value,
    ) -> Result<(), WriteError>;

    /// Fetch the document of `doc_type`, if one exists
    async fn find_document(
        &self,
        handle: &mut Self::Handle,
        doc_type: &str,
    ) -> Result<Option<Value>, ReadError>;
}

/// Document types double as file names and keys
pub(crate) fn validate_document_type(doc_type: &str) -> Result<(), WriteError> {
    let valid = !doc_type.is_empty()
        && doc_type
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if valid {
        Ok(())
    } else {
        Err(WriteError::InvalidDocumentType(doc_type.to_string()))
    }
}

/// Stored form of a snapshot: its fields plus the `type` key
pub fn snapshot_document(snapshot: &StatisticsSnapshot) -> Result<Value, WriteError> {
    let mut document = serde_json::to_value(snapshot)?;
    match document.as_object_mut() {
        Some(fields) => {
            fields.insert(
                "type".to_string(),
                Value::String(SNAPSHOT_DOCUMENT_TYPE.to_string()),
            );
            Ok(document)
        }
        None => Err(WriteError::Backend(
            "snapshot did not serialize to an object".to_string(),
        )),
    }
}

/// Upsert `snapshot` and release `handle`, surfacing the write error
pub async fn try_publish<D>(
    sink: &D,
    mut handle: D::Handle,
    snapshot: &StatisticsSnapshot,
) -> Result<(), WriteError>
where
    D: DocumentSink + ?Sized,
{
    let result = match snapshot_document(snapshot) {
        Ok(document) => {
            sink.replace_document(&mut handle, SNAPSHOT_DOCUMENT_TYPE, &document)
                .await
        }
        Err(e) => Err(e),
    };

    sink.release(handle).await;
    result
}

/// Upsert `snapshot` and release `handle`
///
/// Returns `false` (after logging) when the backend rejects the write.
pub async fn publish<D>(sink: &D, handle: D::Handle, snapshot: &StatisticsSnapshot) -> bool
where
    D: DocumentSink + ?Sized,
{
    match try_publish(sink, handle, snapshot).await {
        Ok(()) => {
            log::info!(
                "✅ Published {} to {} (count: {}, min: {:?}, max: {:?}, median: {:?})",
                SNAPSHOT_DOCUMENT_TYPE,
                sink.backend_type(),
                snapshot.count,
                snapshot.min,
                snapshot.max,
                snapshot.median
            );
            true
        }
        Err(e) => {
            log::error!(
                "❌ Failed to publish {} to {}: {}",
                SNAPSHOT_DOCUMENT_TYPE,
                sink.backend_type(),
                e
            );
            false
        }
    }
}

/// Read the current snapshot and release `handle`
pub async fn latest_snapshot<D>(
    sink: &D,
    mut handle: D::Handle,
) -> Result<Option<StatisticsSnapshot>, ReadError>
where
    D: DocumentSink + ?Sized,
{
    let result = sink.find_document(&mut handle, SNAPSHOT_DOCUMENT_TYPE).await;
    sink.release(handle).await;

    match result? {
        Some(document) => Ok(Some(serde_json::from_value(document)?)),
        None => Ok(None),
    }
}
