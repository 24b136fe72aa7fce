//! Backing stores for credentials.
//!
//! A [`CredentialBackend`] persists single string values under a
//! [`StorageKey`]. Each write replaces one key atomically: after a failed
//! write the key still holds its previous value.
//!
//! # Implementations
//!
//! - [`KeyringBackend`]: the OS secure store (Keychain on Apple platforms,
//!   Credential Manager on Windows)
//! - [`FileBackend`]: a JSON document in an app-private directory, for
//!   platforms without a usable secure store
//! - [`MemoryBackend`]: process-local storage for tests and ephemeral sessions
//!
//! [`CredentialStore::platform_default`](crate::auth::CredentialStore::platform_default)
//! picks between the first two at startup; callers never branch on the
//! backend.

mod file;
mod memory;
mod secure;

pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use secure::KeyringBackend;

use async_trait::async_trait;
use thiserror::Error;

use crate::auth::StorageKey;

/// Errors reported by a credential backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// A value could not be read.
    #[error("Failed to read '{key}' from credential storage: {reason}")]
    ReadFailed {
        /// The key being read.
        key: StorageKey,
        /// The underlying failure.
        reason: String,
    },

    /// A value could not be written. The key keeps its previous value.
    #[error("Failed to write '{key}' to credential storage: {reason}")]
    WriteFailed {
        /// The key being written.
        key: StorageKey,
        /// The underlying failure.
        reason: String,
    },

    /// A value could not be deleted.
    #[error("Failed to delete '{key}' from credential storage: {reason}")]
    DeleteFailed {
        /// The key being deleted.
        key: StorageKey,
        /// The underlying failure.
        reason: String,
    },
}

/// Key-value persistence for credentials.
#[async_trait]
pub trait CredentialBackend: Send + Sync + std::fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Reads the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReadFailed`] if the store cannot be read.
    async fn read(&self, key: StorageKey) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::WriteFailed`] if the value was not stored.
    async fn write(&self, key: StorageKey, value: &str) -> Result<(), StorageError>;

    /// Removes `key`. Removing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::DeleteFailed`] if the key may still be present.
    async fn delete(&self, key: StorageKey) -> Result<(), StorageError>;
}
