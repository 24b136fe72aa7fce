//! Error types surfaced by the request pipeline.
//!
//! Every failed call ends in exactly one [`ClientError`]:
//!
//! - [`ClientError::Classified`]: the call reached the transport and failed;
//!   the [`ClassifiedError`] carries one of the four [`ErrorKind`]s
//! - [`ClientError::RateLimited`]: the call was refused locally before any
//!   network traffic
//! - [`ClientError::InvalidOperation`]: the operation failed validation and
//!   was never sent
//!
//! The builder reports the same [`InvalidOperationError`] when an operation
//! is built; the pipeline checks again because the fields are public.
//!
//! # Example
//!
//! ```rust,ignore
//! use shop_api_client::clients::{ClientError, ErrorKind};
//!
//! match client.execute(&operation).await {
//!     Ok(data) => println!("{data}"),
//!     Err(ClientError::Classified(e)) if e.kind == ErrorKind::AuthExpired => {
//!         // stored credentials are already cleared; route to sign-in
//!     }
//!     Err(ClientError::RateLimited(e)) => {
//!         println!("Slow down, retry in {:?}", e.retry_after);
//!     }
//!     Err(e) => println!("Request failed: {e}"),
//! }
//! ```

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Failure taxonomy of the pipeline.
///
/// The set is exhaustive: anything that cannot be recognized is
/// [`ErrorKind::Unknown`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The backend rejected the credentials; stored tokens are cleared.
    AuthExpired,
    /// A connection-level failure such as a timeout, DNS failure or reset.
    Network,
    /// A structured validation or business error reported by the backend.
    GraphqlValidation,
    /// Anything the classifier did not recognize.
    Unknown,
}

impl ErrorKind {
    /// Returns whether failures of this kind may be retried.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Network)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthExpired => write!(f, "auth_expired"),
            Self::Network => write!(f, "network"),
            Self::GraphqlValidation => write!(f, "graphql_validation"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A failure normalized into the pipeline's taxonomy.
///
/// Produced once per failed attempt by
/// [`classify`](crate::clients::classify) and immutable afterwards.
///
/// # Example
///
/// ```rust
/// use shop_api_client::clients::{ClassifiedError, ErrorKind};
///
/// let error = ClassifiedError::new(ErrorKind::Network, "connection reset", "GetCart");
/// assert!(error.retryable);
/// assert_eq!(error.to_string(), "network error in GetCart: connection reset");
/// ```
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{kind} error in {operation}: {message}")]
pub struct ClassifiedError {
    /// The taxonomy kind.
    pub kind: ErrorKind,
    /// Human-readable description of the failure.
    pub message: String,
    /// Whether the retry policy may re-attempt the call.
    pub retryable: bool,
    /// Name of the operation that failed.
    pub operation: String,
    /// HTTP status of the failed attempt, when there was one.
    pub status: Option<u16>,
}

impl ClassifiedError {
    /// Creates a classified error; `retryable` follows the kind.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: kind.is_retryable(),
            operation: operation.into(),
            status: None,
        }
    }

    /// Attaches the HTTP status that produced the failure.
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Returns `true` for [`ErrorKind::AuthExpired`].
    #[must_use]
    pub fn is_auth_expired(&self) -> bool {
        self.kind == ErrorKind::AuthExpired
    }
}

/// A call refused by the local rate limiter.
///
/// No network request was made. Retrying before `retry_after` elapses is
/// refused again, so the pipeline never retries this outcome.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("Rate limit exceeded for {bucket} traffic (key '{key}'). Retry after {retry_after:?}.")]
pub struct RateLimitedError {
    /// The traffic class whose limit was hit (`general` or `auth`).
    pub bucket: &'static str,
    /// The identity key that was checked.
    pub key: String,
    /// Time until the window admits another call.
    pub retry_after: Duration,
}

/// Unified error type returned by [`GraphqlClient::execute`](crate::GraphqlClient::execute).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ClientError {
    /// The call failed and was classified.
    #[error(transparent)]
    Classified(#[from] ClassifiedError),

    /// The call was refused by the rate limiter.
    #[error(transparent)]
    RateLimited(#[from] RateLimitedError),

    /// The operation failed validation before any network traffic.
    #[error(transparent)]
    InvalidOperation(#[from] InvalidOperationError),
}

impl ClientError {
    /// Returns the taxonomy kind, or `None` for a call that never reached
    /// the transport.
    #[must_use]
    pub const fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Classified(e) => Some(e.kind),
            Self::RateLimited(_) | Self::InvalidOperation(_) => None,
        }
    }

    /// Returns `true` if the session expired and credentials were cleared.
    #[must_use]
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Classified(e) if e.is_auth_expired())
    }

    /// Returns `true` if the call was refused by the rate limiter.
    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}

/// Error returned when an [`Operation`](crate::clients::Operation) fails
/// validation while being built.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidOperationError {
    /// The GraphQL document is empty.
    #[error("Cannot build operation '{name}' without a query document.")]
    EmptyQuery {
        /// The operation name.
        name: String,
    },

    /// The operation name is empty.
    #[error("Operation name cannot be empty.")]
    EmptyName,

    /// Variables must be a JSON object.
    #[error("Variables for '{name}' must be a JSON object.")]
    VariablesNotObject {
        /// The operation name.
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_follows_kind() {
        assert!(ClassifiedError::new(ErrorKind::Network, "m", "op").retryable);
        assert!(!ClassifiedError::new(ErrorKind::AuthExpired, "m", "op").retryable);
        assert!(!ClassifiedError::new(ErrorKind::GraphqlValidation, "m", "op").retryable);
        assert!(!ClassifiedError::new(ErrorKind::Unknown, "m", "op").retryable);
    }

    #[test]
    fn test_classified_error_display_names_operation() {
        let error = ClassifiedError::new(ErrorKind::AuthExpired, "token expired", "GetOrders")
            .with_status(401);
        assert_eq!(
            error.to_string(),
            "auth_expired error in GetOrders: token expired"
        );
        assert_eq!(error.status, Some(401));
    }

    #[test]
    fn test_client_error_helpers() {
        let expired: ClientError =
            ClassifiedError::new(ErrorKind::AuthExpired, "m", "op").into();
        assert!(expired.is_auth_expired());
        assert!(!expired.is_rate_limited());
        assert_eq!(expired.kind(), Some(ErrorKind::AuthExpired));

        let limited: ClientError = RateLimitedError {
            bucket: "auth",
            key: "user@example.com".to_string(),
            retry_after: Duration::from_secs(3),
        }
        .into();
        assert!(limited.is_rate_limited());
        assert!(!limited.is_auth_expired());
        assert_eq!(limited.kind(), None);
        assert!(limited.to_string().contains("auth traffic"));
    }

    #[test]
    fn test_invalid_operation_error_messages() {
        let error = InvalidOperationError::EmptyQuery {
            name: "GetCart".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Cannot build operation 'GetCart' without a query document."
        );
    }

    #[test]
    fn test_error_types_implement_std_error() {
        let classified: &dyn std::error::Error =
            &ClassifiedError::new(ErrorKind::Unknown, "m", "op");
        let _ = classified;

        let invalid: &dyn std::error::Error = &InvalidOperationError::EmptyName;
        let _ = invalid;
    }
}
