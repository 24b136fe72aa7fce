//! # Shop API Client
//!
//! The resilient, authenticated API client layer of the shop mobile app.
//! It sits between UI code and the GraphQL backend and owns everything that
//! happens to a call on the way out and back.
//!
//! ## Overview
//!
//! This crate provides:
//! - Type-safe configuration via [`ClientConfig`] and [`ClientConfigBuilder`]
//! - Secure credential storage via [`auth::CredentialStore`], backed by the
//!   OS keychain with a private-file fallback
//! - Sliding-window rate limiting per caller, with a stricter bucket for
//!   authentication traffic
//! - Automatic `Authorization`, `X-App-Version`, `X-Platform` and
//!   `X-Request-ID` headers
//! - Failure classification into auth, network, validation and unknown
//!   errors, with backoff retries for network failures only
//! - Credential invalidation and a [`auth::SessionEvent::Expired`]
//!   notification when the backend rejects the session
//!
//! ## Quick Start
//!
//! ```rust
//! use shop_api_client::{AppVersion, ClientConfig, Endpoint};
//!
//! let config = ClientConfig::builder()
//!     .endpoint(Endpoint::new("https://api.example.com/graphql").unwrap())
//!     .app_version(AppVersion::new("2.4.0").unwrap())
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.platform(), "mobile");
//! ```
//!
//! ## Making Requests
//!
//! ```rust,ignore
//! use shop_api_client::GraphqlClient;
//! use shop_api_client::clients::Operation;
//!
//! let client = GraphqlClient::connect(config).await?;
//!
//! let op = Operation::builder("GetCart", "query GetCart { cart { id total } }").build()?;
//! let data = client.execute(&op).await?;
//! ```
//!
//! ## Sessions
//!
//! ```rust,ignore
//! use shop_api_client::auth::{login, logout, LoginCredentials, SessionEvent};
//!
//! let mut events = client.subscribe();
//! login(&client, SIGN_IN_MUTATION, &LoginCredentials::new("a@b.c", "secret")).await?;
//!
//! // Elsewhere: route to sign-in when the backend rejects the session
//! if let Ok(SessionEvent::Expired { .. }) = events.recv().await {
//!     show_sign_in();
//! }
//!
//! logout(&client).await;
//! ```
//!
//! ## Design Principles
//!
//! - **No global state**: Configuration is instance-based and passed explicitly
//! - **Fail-fast validation**: Newtypes and builders validate on construction
//! - **Thread-safe**: All types are `Send + Sync`
//! - **Async-first**: Designed for use with Tokio async runtime
//! - **Cancellable**: Dropping a call's future stops it at the next await

pub mod auth;
pub mod clients;
pub mod config;
pub mod error;

// Re-export public types at crate root for convenience
pub use config::{AppVersion, ClientConfig, ClientConfigBuilder, Endpoint};
pub use error::ConfigError;

// Re-export client types
pub use clients::{ClientError, GraphqlClient, Operation, OperationKind};
