//! App version sent with every request.
//!
//! This module provides the [`AppVersion`] type, a validated semantic version
//! string used for the `X-App-Version` header.

use crate::error::ConfigError;
use std::fmt;
use std::str::FromStr;

/// Semantic version of the embedding app.
///
/// Accepts `MAJOR.MINOR.PATCH` with an optional `-prerelease` and `+build`
/// suffix. A leading `v` is stripped.
///
/// # Example
///
/// ```rust
/// use shop_api_client::AppVersion;
///
/// let version: AppVersion = "2.7.1".parse().unwrap();
/// assert_eq!(version.major(), 2);
/// assert_eq!(version.to_string(), "2.7.1");
///
/// let version = AppVersion::new("v3.0.0-beta.2").unwrap();
/// assert_eq!(version.as_ref(), "3.0.0-beta.2");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AppVersion {
    raw: String,
    major: u64,
    minor: u64,
    patch: u64,
}

impl AppVersion {
    /// Creates a new validated app version.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidAppVersion`] if the string is not a
    /// semantic version.
    pub fn new(version: impl Into<String>) -> Result<Self, ConfigError> {
        let version = version.into();
        let trimmed = version.trim();
        let raw = trimmed.strip_prefix('v').unwrap_or(trimmed).to_string();
        let invalid = || ConfigError::InvalidAppVersion {
            version: version.clone(),
        };

        // Core ends at the first prerelease or build separator
        let core_end = raw.find(['-', '+']).unwrap_or(raw.len());
        let (core, suffix) = raw.split_at(core_end);
        if suffix.len() == 1 {
            return Err(invalid());
        }

        let mut parts = core.split('.');
        let mut next = || -> Result<u64, ConfigError> {
            let part = parts.next().ok_or_else(invalid)?;
            if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse().map_err(|_| invalid())
        };
        let major = next()?;
        let minor = next()?;
        let patch = next()?;
        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(Self {
            raw,
            major,
            minor,
            patch,
        })
    }

    /// Returns the major component.
    #[must_use]
    pub const fn major(&self) -> u64 {
        self.major
    }

    /// Returns the minor component.
    #[must_use]
    pub const fn minor(&self) -> u64 {
        self.minor
    }

    /// Returns the patch component.
    #[must_use]
    pub const fn patch(&self) -> u64 {
        self.patch
    }
}

impl AsRef<str> for AppVersion {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for AppVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for AppVersion {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
