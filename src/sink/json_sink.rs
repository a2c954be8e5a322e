//! JSON directory document sink
//!
//! Each document type is one pretty-printed `<type>.json` file. Writes go to a
//! temp file in the same directory and are renamed over the target, so readers
//! see either the previous document or the new one, never a partial write.

use super::{validate_document_type, DocumentSink};
use crate::error::{ConnectionError, ReadError, WriteError};
use crate::supervisor::Connector;
use async_trait::async_trait;
use serde_json::Value;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub struct JsonDocumentSink {
    dir: PathBuf,
}

/// Open document directory
#[derive(Debug)]
pub struct DocumentDir {
    root: PathBuf,
}

impl DocumentDir {
    fn document_path(&self, doc_type: &str) -> PathBuf {
        self.root.join(format!("{}.json", doc_type))
    }
}

impl JsonDocumentSink {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl Connector for JsonDocumentSink {
    type Handle = DocumentDir;

    async fn connect(&self) -> Result<DocumentDir, ConnectionError> {
        fs::create_dir_all(&self.dir)?;
        Ok(DocumentDir {
            root: self.dir.clone(),
        })
    }

    async fn ping(&self, handle: &mut DocumentDir) -> Result<(), ConnectionError> {
        let metadata = fs::metadata(&handle.root)?;
        if !metadata.is_dir() {
            return Err(ConnectionError::NotAlive(format!(
                "{} is not a directory",
                handle.root.display()
            )));
        }
        if metadata.permissions().readonly() {
            return Err(ConnectionError::NotAlive(format!(
                "{} is read-only",
                handle.root.display()
            )));
        }
        Ok(())
    }

    async fn release(&self, _handle: DocumentDir) {}

    fn backend_type(&self) -> &'static str {
        "JSON"
    }
}

#[async_trait]
impl DocumentSink for JsonDocumentSink {
    async fn replace_document(
        &self,
        handle: &mut DocumentDir,
        doc_type: &str,
        document: &Value,
    ) -> Result<(), WriteError> {
        validate_document_type(doc_type)?;
        let json = serde_json::to_string_pretty(document)?;

        let mut tmp = NamedTempFile::new_in(&handle.root)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(handle.document_path(doc_type))?;

        log::debug!("📝 Wrote {}", handle.document_path(doc_type).display());
        Ok(())
    }

    async fn find_document(
        &self,
        handle: &mut DocumentDir,
        doc_type: &str,
    ) -> Result<Option<Value>, ReadError> {
        validate_document_type(doc_type).map_err(|e| ReadError::Backend(e.to_string()))?;

        let json = match fs::read_to_string(handle.document_path(doc_type)) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(serde_json::from_str(&json)?))
    }
}
