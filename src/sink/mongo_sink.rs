//! MongoDB document sink
//!
//! Documents live in one collection and are keyed by their `type` field. The
//! results service reads the same collection, so the stored shape is the plain
//! snapshot plus `type` (the server-assigned `_id` is stripped on read).

use super::{validate_document_type, DocumentSink};
use crate::error::{ConnectionError, ReadError, WriteError};
use crate::supervisor::Connector;
use async_trait::async_trait;
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::ClientOptions;
use mongodb::Client;
use serde_json::Value;
use std::time::Duration;

const APP_NAME: &str = "statflow";

/// Without this the driver waits 30s for server selection on every attempt
const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(5);

pub struct MongoDocumentSink {
    uri: String,
    database: String,
    collection: String,
}

impl MongoDocumentSink {
    pub fn new(uri: impl Into<String>, database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            collection: collection.into(),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn documents(&self, client: &Client) -> mongodb::Collection<Document> {
        client.database(&self.database).collection(&self.collection)
    }
}

/// Selects the single document of `doc_type`
pub(crate) fn document_filter(doc_type: &str) -> Document {
    doc! { "type": doc_type }
}

pub(crate) fn replacement_document(document: &Value) -> Result<Document, WriteError> {
    Ok(mongodb::bson::to_document(document)?)
}

pub(crate) fn stored_document_to_json(mut stored: Document) -> Value {
    stored.remove("_id");
    Bson::Document(stored).into_relaxed_extjson()
}

#[async_trait]
impl Connector for MongoDocumentSink {
    type Handle = Client;

    async fn connect(&self) -> Result<Client, ConnectionError> {
        let mut options = ClientOptions::parse(&self.uri).await?;
        if options.app_name.is_none() {
            options.app_name = Some(APP_NAME.to_string());
        }
        if options.server_selection_timeout.is_none() {
            options.server_selection_timeout = Some(SERVER_SELECTION_TIMEOUT);
        }

        Ok(Client::with_options(options)?)
    }

    async fn ping(&self, handle: &mut Client) -> Result<(), ConnectionError> {
        handle.database("admin").run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    async fn release(&self, handle: Client) {
        handle.shutdown().await;
    }

    fn backend_type(&self) -> &'static str {
        "MongoDB"
    }
}

#[async_trait]
impl DocumentSink for MongoDocumentSink {
    async fn replace_document(
        &self,
        handle: &mut Client,
        doc_type: &str,
        document: &Value,
    ) -> Result<(), WriteError> {
        validate_document_type(doc_type)?;
        let replacement = replacement_document(document)?;

        let result = self
            .documents(handle)
            .replace_one(document_filter(doc_type), replacement)
            .upsert(true)
            .await?;

        log::debug!(
            "💾 {}.{} {}: matched {}, upserted {}",
            self.database,
            self.collection,
            doc_type,
            result.matched_count,
            result.upserted_id.is_some()
        );

        Ok(())
    }

    async fn find_document(
        &self,
        handle: &mut Client,
        doc_type: &str,
    ) -> Result<Option<Value>, ReadError> {
        let stored = self.documents(handle).find_one(document_filter(doc_type)).await?;
        Ok(stored.map(stored_document_to_json))
    }
}
