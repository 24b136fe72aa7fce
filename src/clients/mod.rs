//! Request pipeline and the types it is assembled from.
//!
//! This module provides the resilient call path between app code and the
//! GraphQL backend: admission control, header injection, transport,
//! failure classification and retries.
//!
//! # Overview
//!
//! The main types in this module are:
//!
//! - [`GraphqlClient`]: The public entry point (`execute`, `execute_as`)
//! - [`RequestPipeline`]: The staged call loop behind the client
//! - [`Operation`]: A GraphQL operation plus its throttling class
//! - [`RateLimiter`] / [`RateLimiters`]: Sliding-window admission control
//! - [`RetryPolicy`]: Backoff with jitter, limited to network failures
//! - [`classify`]: Maps a [`TransportFailure`] to a [`ClassifiedError`]
//! - [`Transport`] / [`HttpTransport`]: The network seam
//! - [`ClientError`]: The single error type returned by a call
//!
//! # Retry Behavior
//!
//! - **Network** (timeouts, resets, 408/502/503/504): retried up to the
//!   policy's attempt limit with exponential backoff and ±20% jitter
//! - **Auth expired** (401 or an auth error code): never retried; stored
//!   credentials are cleared
//! - **Validation** and **unknown** failures: returned immediately
//! - **Rate limited**: refused locally, never retried
//!
//! # Example
//!
//! ```rust,ignore
//! use shop_api_client::clients::{ClientError, Operation};
//!
//! let op = Operation::builder("GetWishlist", "query GetWishlist { wishlist { items { id } } }")
//!     .build()?;
//!
//! match client.execute(&op).await {
//!     Ok(data) => println!("{}", data["wishlist"]),
//!     Err(e) if e.is_auth_expired() => println!("Please sign in again"),
//!     Err(e) => println!("Request failed: {e}"),
//! }
//! ```

mod classifier;
mod errors;
pub mod graphql;
mod headers;
mod pipeline;
mod rate_limit;
mod request_id;
mod retry;
mod transport;

pub use classifier::classify;
pub use errors::{
    ClassifiedError, ClientError, ErrorKind, InvalidOperationError, RateLimitedError,
};
pub use headers::RequestContext;
pub use pipeline::{RequestPipeline, ANONYMOUS_KEY};
pub use rate_limit::{RateLimitConfig, RateLimiter, RateLimiters};
pub use request_id::RequestIdGenerator;
pub use retry::{
    RetryDecision, RetryPolicy, RetryPolicyBuilder, RetryState, DEFAULT_INITIAL_DELAY,
    DEFAULT_JITTER, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY,
};
pub use transport::{
    interpret_response, GraphqlErrorPayload, HttpTransport, Transport, TransportFailure,
    TransportRequest, SDK_VERSION,
};

// Re-export GraphQL types at the clients module level
pub use graphql::{GraphqlClient, Operation, OperationBuilder, OperationKind};
