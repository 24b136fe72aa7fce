//! File backend for platforms without a usable secure store.
//!
//! All keys live in one JSON document. Every mutation writes the document to
//! a temporary file, syncs it to disk and renames it over the original, so a
//! crash leaves either the old or the new document, never a torn one. On unix
//! the temporary file is created with mode `0600`, before any byte is written.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::{CredentialBackend, StorageError};
use crate::auth::StorageKey;

/// File name of the credential document.
pub const FILE_NAME: &str = "credentials.json";

type Document = BTreeMap<String, String>;

/// Credential storage in an app-private JSON file.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    // Serializes read-modify-write cycles on the shared document
    lock: Mutex<()>,
}

impl FileBackend {
    /// Creates a backend storing `credentials.json` inside `dir`.
    ///
    /// The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(FILE_NAME),
            lock: Mutex::new(()),
        }
    }

    /// Returns the path of the credential document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }

    async fn load(&self) -> Result<Document, String> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(Document::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| e.to_string()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Document::new()),
            Err(e) => Err(e.to_string()),
        }
    }

    // A document we cannot parse is ours to replace; refusing would lock the
    // user out of signing in again.
    async fn load_for_update(&self) -> Document {
        self.load().await.unwrap_or_else(|reason| {
            tracing::warn!(path = %self.path.display(), %reason, "Discarding unreadable credential file");
            Document::new()
        })
    }

    async fn persist(&self, document: &Document) -> Result<(), String> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| e.to_string())?;
        }

        let bytes = serde_json::to_vec(document).map_err(|e| e.to_string())?;
        let tmp = self.tmp_path();

        // A leftover temp file would keep its old mode through truncation
        match tokio::fs::remove_file(&tmp).await {
            Err(e) if e.kind() != ErrorKind::NotFound => return Err(e.to_string()),
            _ => {}
        }

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&tmp).await.map_err(|e| e.to_string())?;
        file.write_all(&bytes).await.map_err(|e| e.to_string())?;
        file.sync_all().await.map_err(|e| e.to_string())?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl CredentialBackend for FileBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn read(&self, key: StorageKey) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().await;
        let document = self
            .load()
            .await
            .map_err(|reason| StorageError::ReadFailed { key, reason })?;
        Ok(document.get(key.as_str()).cloned())
    }

    async fn write(&self, key: StorageKey, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut document = self.load_for_update().await;
        document.insert(key.as_str().to_string(), value.to_string());
        self.persist(&document)
            .await
            .map_err(|reason| StorageError::WriteFailed { key, reason })
    }

    async fn delete(&self, key: StorageKey) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut document = self.load_for_update().await;
        if document.remove(key.as_str()).is_none() {
            return Ok(());
        }
        self.persist(&document)
            .await
            .map_err(|reason| StorageError::DeleteFailed { key, reason })
    }
}
