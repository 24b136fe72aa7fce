//! Credential storage and session lifecycle.
//!
//! # Overview
//!
//! - [`CredentialStore`]: Async storage for tokens and the other keys the
//!   client owns, over a pluggable [`CredentialBackend`]
//! - [`Credential`]: An access/refresh token pair
//! - [`StorageKey`]: The closed set of persisted keys
//! - [`login`], [`logout`], [`refresh_session`]: Session operations run
//!   through a [`GraphqlClient`](crate::GraphqlClient)
//! - [`SessionEvent`]: Notifications for sign-in, sign-out and expiry
//!
//! # Example
//!
//! ```rust
//! use shop_api_client::auth::{CredentialStore, TokenKind};
//!
//! # tokio_test::block_on(async {
//! let store = CredentialStore::in_memory();
//! store.set("access-token", Some("refresh-token")).await.unwrap();
//!
//! let credential = store.credential().await.unwrap();
//! assert_eq!(credential.access_token, "access-token");
//!
//! store.clear(Some(TokenKind::Access)).await;
//! assert!(store.credential().await.is_none());
//! # });
//! ```

mod credentials;
mod session;
pub mod storage;
mod store;

pub use credentials::{Credential, StorageKey, TokenKind};
pub use session::{
    login, logout, refresh_session, LoginCredentials, SessionError, SessionEvent,
    DEFAULT_LOGIN_OPERATION, DEFAULT_REFRESH_OPERATION,
};
pub use storage::{
    CredentialBackend, FileBackend, KeyringBackend, MemoryBackend, StorageError,
};
pub use store::CredentialStore;
