//! Configuration types for the API client layer.
//!
//! # Overview
//!
//! The main types in this module are:
//!
//! - [`ClientConfig`]: The configuration struct holding all client settings
//! - [`ClientConfigBuilder`]: A builder for constructing [`ClientConfig`] instances
//! - [`Endpoint`]: A validated GraphQL endpoint URL
//! - [`AppVersion`]: A validated semantic version for the `X-App-Version` header
//!
//! # Example
//!
//! ```rust
//! use shop_api_client::{ClientConfig, Endpoint, AppVersion};
//!
//! let config = ClientConfig::builder()
//!     .endpoint(Endpoint::new("https://api.example.com/graphql").unwrap())
//!     .app_version(AppVersion::new("1.4.2").unwrap())
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.platform(), "mobile");
//! ```

mod newtypes;
mod version;

pub use newtypes::Endpoint;
pub use version::AppVersion;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::clients::{RateLimitConfig, RetryPolicy};
use crate::error::ConfigError;

/// Default value of the `X-Platform` header.
pub const DEFAULT_PLATFORM: &str = "mobile";

/// Default per-attempt transport timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default keyring service name for stored credentials.
pub const DEFAULT_STORAGE_SERVICE: &str = "shop-api-client";

/// Configuration for the API client layer.
///
/// # Thread Safety
///
/// `ClientConfig` is `Clone`, `Send`, and `Sync`, making it safe to share
/// across threads and async tasks.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    endpoint: Endpoint,
    app_version: AppVersion,
    platform: String,
    request_timeout: Duration,
    retry_policy: RetryPolicy,
    general_rate_limit: RateLimitConfig,
    auth_rate_limit: RateLimitConfig,
    storage_service: String,
    storage_dir: PathBuf,
    user_agent_prefix: Option<String>,
}

impl ClientConfig {
    /// Creates a new builder for constructing a `ClientConfig`.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Returns the GraphQL endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Returns the app version sent as `X-App-Version`.
    #[must_use]
    pub const fn app_version(&self) -> &AppVersion {
        &self.app_version
    }

    /// Returns the platform sent as `X-Platform`.
    #[must_use]
    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// Returns the per-attempt transport timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Returns the retry policy.
    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Returns the limit applied to general API traffic.
    #[must_use]
    pub const fn general_rate_limit(&self) -> RateLimitConfig {
        self.general_rate_limit
    }

    /// Returns the limit applied to authentication traffic.
    #[must_use]
    pub const fn auth_rate_limit(&self) -> RateLimitConfig {
        self.auth_rate_limit
    }

    /// Returns the keyring service name used by the secure credential backend.
    #[must_use]
    pub fn storage_service(&self) -> &str {
        &self.storage_service
    }

    /// Returns the directory used by the file credential backend.
    #[must_use]
    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Returns the user agent prefix, if configured.
    #[must_use]
    pub fn user_agent_prefix(&self) -> Option<&str> {
        self.user_agent_prefix.as_deref()
    }
}

// Verify ClientConfig is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ClientConfig>();
};

/// Builder for constructing [`ClientConfig`] instances.
///
/// Required fields are `endpoint` and `app_version`.
///
/// # Defaults
///
/// - `platform`: `"mobile"`
/// - `request_timeout`: 30 seconds
/// - `retry_policy`: [`RetryPolicy::default`] (3 attempts, 300 ms doubling to 3 s)
/// - `general_rate_limit`: 100 requests per 60 seconds
/// - `auth_rate_limit`: 5 requests per 300 seconds
/// - `storage_service`: `"shop-api-client"`
/// - `storage_dir`: `<temp dir>/shop-api-client`
/// - `user_agent_prefix`: `None`
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    endpoint: Option<Endpoint>,
    app_version: Option<AppVersion>,
    platform: Option<String>,
    request_timeout: Option<Duration>,
    retry_policy: Option<RetryPolicy>,
    general_rate_limit: Option<RateLimitConfig>,
    auth_rate_limit: Option<RateLimitConfig>,
    storage_service: Option<String>,
    storage_dir: Option<PathBuf>,
    user_agent_prefix: Option<String>,
}

impl ClientConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the GraphQL endpoint (required).
    #[must_use]
    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Sets the app version (required).
    #[must_use]
    pub fn app_version(mut self, version: AppVersion) -> Self {
        self.app_version = Some(version);
        self
    }

    /// Sets the platform identifier.
    #[must_use]
    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    /// Sets the per-attempt transport timeout.
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Sets the limit for general API traffic.
    #[must_use]
    pub const fn general_rate_limit(mut self, limit: RateLimitConfig) -> Self {
        self.general_rate_limit = Some(limit);
        self
    }

    /// Sets the limit for authentication traffic.
    #[must_use]
    pub const fn auth_rate_limit(mut self, limit: RateLimitConfig) -> Self {
        self.auth_rate_limit = Some(limit);
        self
    }

    /// Sets the keyring service name.
    #[must_use]
    pub fn storage_service(mut self, service: impl Into<String>) -> Self {
        self.storage_service = Some(service.into());
        self
    }

    /// Sets the directory for the file credential backend.
    #[must_use]
    pub fn storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = Some(dir.into());
        self
    }

    /// Sets the user agent prefix for HTTP requests.
    #[must_use]
    pub fn user_agent_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.user_agent_prefix = Some(prefix.into());
        self
    }

    /// Builds the [`ClientConfig`], validating that required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequiredField`] if `endpoint` or
    /// `app_version` are not set, [`ConfigError::EmptyPlatform`] for a blank
    /// platform and [`ConfigError::InvalidRateLimit`] for a zero limit.
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        let endpoint = self
            .endpoint
            .ok_or(ConfigError::MissingRequiredField { field: "endpoint" })?;
        let app_version = self
            .app_version
            .ok_or(ConfigError::MissingRequiredField {
                field: "app_version",
            })?;

        let platform = self
            .platform
            .unwrap_or_else(|| DEFAULT_PLATFORM.to_string());
        if platform.trim().is_empty() {
            return Err(ConfigError::EmptyPlatform);
        }

        let general_rate_limit = self.general_rate_limit.unwrap_or_else(RateLimitConfig::general);
        if !general_rate_limit.is_valid() {
            return Err(ConfigError::InvalidRateLimit { bucket: "general" });
        }
        let auth_rate_limit = self.auth_rate_limit.unwrap_or_else(RateLimitConfig::auth);
        if !auth_rate_limit.is_valid() {
            return Err(ConfigError::InvalidRateLimit { bucket: "auth" });
        }

        Ok(ClientConfig {
            endpoint,
            app_version,
            platform,
            request_timeout: self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            retry_policy: self.retry_policy.unwrap_or_default(),
            general_rate_limit,
            auth_rate_limit,
            storage_service: self
                .storage_service
                .unwrap_or_else(|| DEFAULT_STORAGE_SERVICE.to_string()),
            storage_dir: self
                .storage_dir
                .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_STORAGE_SERVICE)),
            user_agent_prefix: self.user_agent_prefix,
        })
    }
}
