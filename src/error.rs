//! Error types for client configuration.
//!
//! This module contains the error type used when building a
//! [`ClientConfig`](crate::ClientConfig) and its validated newtypes.
//!
//! # Error Handling
//!
//! All configuration constructors return `Result<T, ConfigError>` to enable
//! fail-fast validation. Error messages are designed to be clear and actionable.
//!
//! # Example
//!
//! ```rust
//! use shop_api_client::{AppVersion, ConfigError};
//!
//! let result = AppVersion::new("");
//! assert!(matches!(result, Err(ConfigError::InvalidAppVersion { .. })));
//! ```

use thiserror::Error;

/// Errors that can occur during client configuration.
///
/// Each variant provides a clear, actionable error message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Endpoint URL is invalid.
    #[error("Invalid endpoint URL '{url}'. Please provide an http or https URL (e.g., 'https://api.example.com/graphql').")]
    InvalidEndpoint {
        /// The invalid URL that was provided.
        url: String,
    },

    /// App version is invalid.
    #[error("Invalid app version '{version}'. Expected format: 'MAJOR.MINOR.PATCH' (e.g., '1.4.2').")]
    InvalidAppVersion {
        /// The invalid version string that was provided.
        version: String,
    },

    /// Platform identifier cannot be empty.
    #[error("Platform cannot be empty. Please provide a platform identifier such as 'mobile'.")]
    EmptyPlatform,

    /// A rate limit was configured with a zero window or zero quota.
    #[error("Invalid rate limit for '{bucket}': window and max requests must both be greater than zero.")]
    InvalidRateLimit {
        /// The bucket that was misconfigured.
        bucket: &'static str,
    },

    /// A retry policy was configured with inconsistent values.
    #[error("Invalid retry policy: {reason}")]
    InvalidRetryPolicy {
        /// The reason the policy is invalid.
        reason: String,
    },

    /// The HTTP transport could not be initialized.
    #[error("Failed to initialize HTTP transport: {reason}")]
    TransportInit {
        /// The underlying failure.
        reason: String,
    },

    /// A required field is missing.
    #[error("Missing required field: '{field}'. This field must be set before building the configuration.")]
    MissingRequiredField {
        /// The name of the missing field.
        field: &'static str,
    },
}
