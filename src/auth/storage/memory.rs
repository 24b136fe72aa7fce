use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::{CredentialBackend, StorageError};
use crate::auth::StorageKey;

/// Process-local credential storage.
///
/// Values live as long as the backend; nothing touches the disk.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    values: Mutex<HashMap<StorageKey, String>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> std::sync::MutexGuard<'_, HashMap<StorageKey, String>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CredentialBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn read(&self, key: StorageKey) -> Result<Option<String>, StorageError> {
        Ok(self.values().get(&key).cloned())
    }

    async fn write(&self, key: StorageKey, value: &str) -> Result<(), StorageError> {
        self.values().insert(key, value.to_string());
        Ok(())
    }

    async fn delete(&self, key: StorageKey) -> Result<(), StorageError> {
        self.values().remove(&key);
        Ok(())
    }
}
