//! Credential and storage key types.

use std::fmt;

/// Which token to read or clear.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// The bearer access token.
    Access,
    /// The refresh token.
    Refresh,
}

impl TokenKind {
    /// Returns the storage key holding this token.
    #[must_use]
    pub const fn storage_key(self) -> StorageKey {
        match self {
            Self::Access => StorageKey::AuthToken,
            Self::Refresh => StorageKey::RefreshToken,
        }
    }
}

/// Every persisted key owned by this crate.
///
/// The string names are stable across versions; stores written by earlier
/// releases stay readable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StorageKey {
    /// Access token (`auth_token`).
    AuthToken,
    /// Refresh token (`refresh_token`).
    RefreshToken,
    /// Signed-in user id (`user_id`).
    UserId,
    /// Biometric unlock flag (`biometric_enabled`).
    BiometricEnabled,
    /// Digest of the unlock pin (`pin_code`).
    PinCode,
    /// Per-install device id (`device_id`).
    DeviceId,
}

impl StorageKey {
    /// All keys, in lock acquisition order.
    pub const ALL: [Self; 6] = [
        Self::AuthToken,
        Self::RefreshToken,
        Self::UserId,
        Self::BiometricEnabled,
        Self::PinCode,
        Self::DeviceId,
    ];

    /// Returns the persisted name of the key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuthToken => "auth_token",
            Self::RefreshToken => "refresh_token",
            Self::UserId => "user_id",
            Self::BiometricEnabled => "biometric_enabled",
            Self::PinCode => "pin_code",
            Self::DeviceId => "device_id",
        }
    }

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An access/refresh token pair.
///
/// The `Debug` implementation masks both values to keep them out of logs.
///
/// # Example
///
/// ```rust
/// use shop_api_client::auth::Credential;
///
/// let credential = Credential::new("access", Some("refresh".to_string()));
/// let debug = format!("{:?}", credential);
/// assert!(!debug.contains("access\""));
/// assert!(debug.contains("*****"));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// The bearer access token.
    pub access_token: String,
    /// The refresh token, if the backend issued one.
    pub refresh_token: Option<String>,
}

impl Credential {
    /// Creates a credential.
    #[must_use]
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"*****")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "*****"))
            .finish()
    }
}
