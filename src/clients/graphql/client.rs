//! GraphQL client facade.
//!
//! This module provides the [`GraphqlClient`] type, the public entry point
//! for executing operations against the app's GraphQL backend.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::broadcast;

use crate::auth::{CredentialStore, SessionEvent};
use crate::clients::{
    ClassifiedError, ClientError, ErrorKind, HttpTransport, Operation, RateLimiters,
    RequestPipeline, Transport,
};
use crate::config::ClientConfig;
use crate::error::ConfigError;

/// GraphQL client with credential injection, retries and rate limiting.
///
/// Every call goes through the [`RequestPipeline`]: the operation is
/// throttled, sent with fresh headers, classified on failure and retried
/// when the failure is transient. An expired session clears the stored
/// credentials and emits [`SessionEvent::Expired`].
///
/// # Thread Safety
///
/// `GraphqlClient` is `Send + Sync` and cheap to clone; clones share the
/// credential store, the rate limiter buckets and the event channel.
///
/// # Example
///
/// ```rust,ignore
/// use shop_api_client::{AppVersion, ClientConfig, Endpoint, GraphqlClient};
/// use shop_api_client::clients::Operation;
/// use serde_json::json;
///
/// let config = ClientConfig::builder()
///     .endpoint(Endpoint::new("https://api.example.com/graphql")?)
///     .app_version(AppVersion::new("2.4.0")?)
///     .build()?;
///
/// let client = GraphqlClient::connect(config).await?;
///
/// let op = Operation::builder("GetCart", "query GetCart($id: ID!) { cart(id: $id) { id total } }")
///     .variables(json!({ "id": "cart-1" }))
///     .build()?;
/// let data = client.execute(&op).await?;
/// println!("Cart total: {}", data["cart"]["total"]);
/// ```
#[derive(Clone, Debug)]
pub struct GraphqlClient {
    config: Arc<ClientConfig>,
    pipeline: Arc<RequestPipeline>,
}

// Verify GraphqlClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<GraphqlClient>();
};

impl GraphqlClient {
    /// Creates a client with the platform's default credential store and an
    /// HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::TransportInit`] if the HTTP client cannot be
    /// built.
    pub async fn connect(config: ClientConfig) -> Result<Self, ConfigError> {
        let transport = HttpTransport::new(&config)?;
        let store = CredentialStore::platform_default(&config).await;
        Ok(Self::with_parts(config, store, Arc::new(transport)))
    }

    /// Creates a client from explicit parts.
    ///
    /// Useful for tests and for embedders that bring their own storage or
    /// transport.
    #[must_use]
    pub fn with_parts(
        config: ClientConfig,
        store: CredentialStore,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let pipeline = RequestPipeline::new(&config, store, transport);
        Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
        }
    }

    /// Executes an operation and returns the response's `data` object.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidOperation`] when the operation fails
    /// [`Operation::verify`], [`ClientError::RateLimited`] when the
    /// operation's bucket is exhausted, or [`ClientError::Classified`] when
    /// the call fails.
    pub async fn execute(&self, operation: &Operation) -> Result<serde_json::Value, ClientError> {
        self.pipeline.execute(operation).await
    }

    /// Executes an operation and deserializes its `data` object into `T`.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`execute`](Self::execute). A `data`
    /// object that does not match `T` is an [`ErrorKind::Unknown`] error.
    pub async fn execute_as<T: DeserializeOwned>(
        &self,
        operation: &Operation,
    ) -> Result<T, ClientError> {
        let data = self.execute(operation).await?;
        serde_json::from_value(data).map_err(|e| {
            ClassifiedError::new(
                ErrorKind::Unknown,
                format!("Unexpected response shape: {e}"),
                &operation.name,
            )
            .into()
        })
    }

    /// Returns the credential store.
    #[must_use]
    pub fn credentials(&self) -> &CredentialStore {
        self.pipeline.store()
    }

    /// Returns the rate limiters.
    #[must_use]
    pub fn rate_limiters(&self) -> &RateLimiters {
        self.pipeline.limiters()
    }

    /// Returns the client's configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Subscribes to session events.
    ///
    /// Only events sent after subscribing are received.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.pipeline.subscribe()
    }

    pub(crate) fn notify(&self, event: SessionEvent) {
        self.pipeline.notify(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{TransportFailure, TransportRequest};
    use crate::config::{AppVersion, Endpoint};
    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug)]
    struct Fixed(serde_json::Value);

    #[async_trait]
    impl Transport for Fixed {
        async fn send(&self, _request: TransportRequest) -> Result<serde_json::Value, TransportFailure> {
            Ok(self.0.clone())
        }
    }

    fn client(data: serde_json::Value) -> GraphqlClient {
        let config = ClientConfig::builder()
            .endpoint(Endpoint::new("https://api.example.com/graphql").unwrap())
            .app_version(AppVersion::new("1.0.0").unwrap())
            .build()
            .unwrap();
        GraphqlClient::with_parts(config, CredentialStore::in_memory(), Arc::new(Fixed(data)))
    }

    fn op() -> Operation {
        Operation::builder("GetCart", "query GetCart { cart { id } }")
            .build()
            .unwrap()
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct CartData {
        cart: Cart,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Cart {
        id: String,
    }

    #[tokio::test]
    async fn test_execute_as_deserializes_data() {
        let client = client(json!({"cart": {"id": "c1"}}));
        let data: CartData = client.execute_as(&op()).await.unwrap();
        assert_eq!(data.cart.id, "c1");
    }

    #[tokio::test]
    async fn test_execute_as_shape_mismatch_is_unknown() {
        let client = client(json!({"cart": {"identifier": 1}}));
        let err = client.execute_as::<CartData>(&op()).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Unknown));
    }

    #[tokio::test]
    async fn test_clones_share_store_and_events() {
        let client = client(json!({}));
        let clone = client.clone();
        let mut events = client.subscribe();

        clone.credentials().set("tok", None).await.unwrap();
        clone.notify(SessionEvent::LoggedOut);

        assert_eq!(
            client
                .credentials()
                .get(crate::auth::TokenKind::Access)
                .await
                .as_deref(),
            Some("tok")
        );
        assert_eq!(events.recv().await.unwrap(), SessionEvent::LoggedOut);
    }
}
