//! OS secure store backend.
//!
//! Thin wrapper over the platform keychain: Keychain Services on iOS and
//! macOS, Credential Manager on Windows. Each [`StorageKey`] is one keyring
//! entry under the configured service name, so every write is atomic per key.
//!
//! The `keyring` API is blocking; calls run on tokio's blocking pool.

use async_trait::async_trait;
use keyring::Entry;
use rand::distributions::{Alphanumeric, DistString};
use tracing::debug;

use super::{CredentialBackend, StorageError};
use crate::auth::StorageKey;

const PROBE_ACCOUNT: &str = "__probe__";

/// Credential storage backed by the platform keychain.
#[derive(Clone, Debug)]
pub struct KeyringBackend {
    service: String,
}

impl KeyringBackend {
    /// Creates a backend storing entries under `service`.
    #[must_use]
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Returns the keyring service name.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Checks that the platform store really persists values.
    ///
    /// Writes a random value, reads it back through a fresh entry and deletes
    /// it. Platforms without a native store only offer an in-process mock
    /// whose entries do not survive this round trip.
    pub async fn probe(&self) -> bool {
        let service = self.service.clone();
        let outcome = tokio::task::spawn_blocking(move || -> Result<bool, keyring::Error> {
            let value = Alphanumeric.sample_string(&mut rand::thread_rng(), 16);
            Entry::new(&service, PROBE_ACCOUNT)?.set_password(&value)?;
            let read_back = Entry::new(&service, PROBE_ACCOUNT)?.get_password();
            // Best effort; a leftover probe entry is harmless
            let _ = Entry::new(&service, PROBE_ACCOUNT).map(|e| e.delete_credential());
            Ok(read_back.is_ok_and(|v| v == value))
        })
        .await;

        match outcome {
            Ok(Ok(usable)) => usable,
            Ok(Err(e)) => {
                debug!(service = %self.service, error = %e, "Secure store probe failed");
                false
            }
            Err(e) => {
                debug!(service = %self.service, error = %e, "Secure store probe did not complete");
                false
            }
        }
    }

    async fn run<T, F>(&self, key: StorageKey, op: F) -> Result<T, String>
    where
        T: Send + 'static,
        F: FnOnce(Entry) -> Result<T, keyring::Error> + Send + 'static,
    {
        let service = self.service.clone();
        tokio::task::spawn_blocking(move || {
            let entry = Entry::new(&service, key.as_str()).map_err(|e| e.to_string())?;
            op(entry).map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| e.to_string())?
    }
}

#[async_trait]
impl CredentialBackend for KeyringBackend {
    fn name(&self) -> &'static str {
        "keyring"
    }

    async fn read(&self, key: StorageKey) -> Result<Option<String>, StorageError> {
        debug!(service = %self.service, key = %key, "Reading secret from keychain");

        self.run(key, |entry| match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e),
        })
        .await
        .map_err(|reason| StorageError::ReadFailed { key, reason })
    }

    async fn write(&self, key: StorageKey, value: &str) -> Result<(), StorageError> {
        debug!(service = %self.service, key = %key, "Storing secret in keychain");

        let value = value.to_string();
        self.run(key, move |entry| entry.set_password(&value))
            .await
            .map_err(|reason| StorageError::WriteFailed { key, reason })
    }

    async fn delete(&self, key: StorageKey) -> Result<(), StorageError> {
        debug!(service = %self.service, key = %key, "Deleting secret from keychain");

        self.run(key, |entry| match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e),
        })
        .await
        .map_err(|reason| StorageError::DeleteFailed { key, reason })
    }
}
