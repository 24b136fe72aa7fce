//! Async credential store over a pluggable backend.

use std::fmt::Write as _;
use std::sync::Arc;

use rand::distributions::{Alphanumeric, DistString};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::auth::storage::{
    CredentialBackend, FileBackend, KeyringBackend, MemoryBackend, StorageError,
};
use crate::auth::{Credential, StorageKey, TokenKind};
use crate::config::ClientConfig;

const DEVICE_ID_LEN: usize = 32;

/// Durable storage for the tokens and keys the client owns.
///
/// Every key is guarded by its own async lock. Operations spanning several
/// keys take their locks in [`StorageKey::ALL`] order, so a reader of the
/// token pair never sees a half-written update and two writers never
/// deadlock.
///
/// Cloning is cheap; clones share the backend and the locks.
///
/// # Example
///
/// ```rust
/// use shop_api_client::auth::{CredentialStore, TokenKind};
///
/// # tokio_test::block_on(async {
/// let store = CredentialStore::in_memory();
/// store.set("access", Some("refresh")).await.unwrap();
/// assert_eq!(store.get(TokenKind::Access).await.as_deref(), Some("access"));
///
/// store.clear_all().await;
/// assert!(store.get(TokenKind::Access).await.is_none());
/// # });
/// ```
#[derive(Clone, Debug)]
pub struct CredentialStore {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    backend: Arc<dyn CredentialBackend>,
    locks: [Mutex<()>; StorageKey::ALL.len()],
}

impl CredentialStore {
    /// Creates a store over the given backend.
    #[must_use]
    pub fn new(backend: impl CredentialBackend + 'static) -> Self {
        Self::from_backend(Arc::new(backend))
    }

    /// Creates a store over a shared backend.
    #[must_use]
    pub fn from_backend(backend: Arc<dyn CredentialBackend>) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                locks: std::array::from_fn(|_| Mutex::new(())),
            }),
        }
    }

    /// Creates a process-local store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    /// Picks the best backend for this platform.
    ///
    /// Uses the OS secure store when it passes a write/read/delete probe and
    /// falls back to a private file in
    /// [`ClientConfig::storage_dir`] otherwise.
    pub async fn platform_default(config: &ClientConfig) -> Self {
        let keyring = KeyringBackend::new(config.storage_service());
        if keyring.probe().await {
            info!(service = config.storage_service(), "Using secure store for credentials");
            return Self::new(keyring);
        }

        let file = FileBackend::new(config.storage_dir());
        info!(path = %file.path().display(), "Secure store unavailable, using file storage for credentials");
        Self::new(file)
    }

    /// Returns the name of the active backend.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.inner.backend.name()
    }

    async fn lock(&self, key: StorageKey) -> MutexGuard<'_, ()> {
        self.inner.locks[key.index()].lock().await
    }

    async fn lock_tokens(&self) -> [MutexGuard<'_, ()>; 2] {
        let access = self.lock(StorageKey::AuthToken).await;
        let refresh = self.lock(StorageKey::RefreshToken).await;
        [access, refresh]
    }

    async fn read_logged(&self, key: StorageKey) -> Option<String> {
        match self.inner.backend.read(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(backend = self.backend_name(), key = %key, error = %e, "Credential read failed");
                None
            }
        }
    }

    async fn delete_logged(&self, key: StorageKey) {
        if let Err(e) = self.inner.backend.delete(key).await {
            warn!(backend = self.backend_name(), key = %key, error = %e, "Credential delete failed");
        }
    }

    // Tokens

    /// Stores the access token and, when given, the refresh token.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::WriteFailed`] naming the key that could not be
    /// written. Each key keeps its previous value on failure.
    pub async fn set(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<(), StorageError> {
        let _guards = self.lock_tokens().await;

        self.inner
            .backend
            .write(StorageKey::AuthToken, access_token)
            .await?;
        if let Some(refresh) = refresh_token {
            self.inner
                .backend
                .write(StorageKey::RefreshToken, refresh)
                .await?;
        }

        debug!(backend = self.backend_name(), refresh = refresh_token.is_some(), "Stored credentials");
        Ok(())
    }

    /// Reads a token. Absent values and read failures both yield `None`.
    pub async fn get(&self, kind: TokenKind) -> Option<String> {
        let key = kind.storage_key();
        let _guard = self.lock(key).await;
        self.read_logged(key).await
    }

    /// Reads the access/refresh pair under both token locks.
    ///
    /// Returns `None` when no access token is stored.
    pub async fn credential(&self) -> Option<Credential> {
        let _guards = self.lock_tokens().await;
        let access_token = self.read_logged(StorageKey::AuthToken).await?;
        let refresh_token = self.read_logged(StorageKey::RefreshToken).await;
        Some(Credential {
            access_token,
            refresh_token,
        })
    }

    /// Deletes one token, or both when `kind` is `None`. Never fails.
    pub async fn clear(&self, kind: Option<TokenKind>) {
        match kind {
            Some(kind) => {
                let key = kind.storage_key();
                let _guard = self.lock(key).await;
                self.delete_logged(key).await;
            }
            None => {
                let _guards = self.lock_tokens().await;
                self.delete_logged(StorageKey::AuthToken).await;
                self.delete_logged(StorageKey::RefreshToken).await;
            }
        }
    }

    /// Deletes every key this client owns. Never fails.
    pub async fn clear_all(&self) {
        let mut guards = Vec::with_capacity(StorageKey::ALL.len());
        for key in StorageKey::ALL {
            guards.push(self.lock(key).await);
        }
        for key in StorageKey::ALL {
            self.delete_logged(key).await;
        }
        debug!(backend = self.backend_name(), "Cleared all credentials");
    }

    // Other owned keys

    /// Stores the signed-in user's id.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::WriteFailed`] if the id was not stored.
    pub async fn set_user_id(&self, user_id: &str) -> Result<(), StorageError> {
        let _guard = self.lock(StorageKey::UserId).await;
        self.inner.backend.write(StorageKey::UserId, user_id).await
    }

    /// Returns the signed-in user's id, if any.
    pub async fn user_id(&self) -> Option<String> {
        let _guard = self.lock(StorageKey::UserId).await;
        self.read_logged(StorageKey::UserId).await
    }

    /// Returns this install's device id, creating one on first use.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the id can neither be read nor stored.
    pub async fn device_id(&self) -> Result<String, StorageError> {
        let _guard = self.lock(StorageKey::DeviceId).await;
        if let Some(id) = self.inner.backend.read(StorageKey::DeviceId).await? {
            return Ok(id);
        }

        let id = Alphanumeric.sample_string(&mut rand::thread_rng(), DEVICE_ID_LEN);
        self.inner.backend.write(StorageKey::DeviceId, &id).await?;
        debug!(backend = self.backend_name(), "Generated device id");
        Ok(id)
    }

    /// Records whether biometric unlock is enabled.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::WriteFailed`] if the flag was not stored.
    pub async fn set_biometric_enabled(&self, enabled: bool) -> Result<(), StorageError> {
        let _guard = self.lock(StorageKey::BiometricEnabled).await;
        self.inner
            .backend
            .write(StorageKey::BiometricEnabled, if enabled { "true" } else { "false" })
            .await
    }

    /// Returns whether biometric unlock is enabled. Defaults to `false`.
    pub async fn biometric_enabled(&self) -> bool {
        let _guard = self.lock(StorageKey::BiometricEnabled).await;
        self.read_logged(StorageKey::BiometricEnabled)
            .await
            .is_some_and(|v| v == "true")
    }

    /// Stores a digest of `pin`. The pin itself is never persisted.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the device id or the digest cannot be
    /// stored.
    pub async fn set_pin(&self, pin: &str) -> Result<(), StorageError> {
        let salt = self.device_id().await?;
        let _guard = self.lock(StorageKey::PinCode).await;
        self.inner
            .backend
            .write(StorageKey::PinCode, &pin_digest(&salt, pin))
            .await
    }

    /// Checks `pin` against the stored digest in constant time.
    ///
    /// Returns `false` when no pin is set or storage cannot be read. Never
    /// writes to storage; a missing device id means no pin was ever set.
    pub async fn verify_pin(&self, pin: &str) -> bool {
        let salt = {
            let _guard = self.lock(StorageKey::DeviceId).await;
            self.read_logged(StorageKey::DeviceId).await
        };
        let Some(salt) = salt else {
            return false;
        };
        let _guard = self.lock(StorageKey::PinCode).await;
        let Some(stored) = self.read_logged(StorageKey::PinCode).await else {
            return false;
        };
        stored
            .as_bytes()
            .ct_eq(pin_digest(&salt, pin).as_bytes())
            .into()
    }
}

fn pin_digest(salt: &str, pin: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(pin.as_bytes());
    hasher
        .finalize()
        .iter()
        .fold(String::with_capacity(64), |mut out, byte| {
            let _ = write!(out, "{byte:02x}");
            out
        })
}
