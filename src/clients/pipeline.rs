//! The request pipeline behind [`GraphqlClient`](crate::GraphqlClient).
//!
//! One logical call moves through a fixed set of stages:
//!
//! 1. **Rate check**: the operation's bucket must admit the caller's key
//! 2. **Context build**: fresh request id and current access token
//! 3. **Transport**: one attempt, bounded by the request timeout
//! 4. **Classify**: a failed attempt becomes a [`ClassifiedError`]
//! 5. **Decide**: retry after a delay, or stop; an expired session clears
//!    stored credentials before the error is returned
//!
//! Stages 2 to 5 repeat per attempt. Dropping the future returned by
//! [`RequestPipeline::execute`] stops the call at whichever await it is
//! parked on.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::auth::{CredentialStore, SessionEvent, TokenKind};
use crate::clients::{
    classify, ClassifiedError, ClientError, Operation, RateLimitedError, RateLimiters,
    RequestContext, RequestIdGenerator, RetryPolicy, RetryState, Transport, TransportFailure,
    TransportRequest,
};
use crate::config::ClientConfig;

/// Rate limit key used when neither the operation nor the store names a user.
pub const ANONYMOUS_KEY: &str = "anonymous";

const EVENT_CAPACITY: usize = 16;

/// Orchestrates rate limiting, header injection, retries and credential
/// invalidation for one client.
///
/// # Thread Safety
///
/// `RequestPipeline` is `Send + Sync`. Calls run concurrently; the only
/// shared state is the limiter buckets and the credential store, both
/// internally synchronized.
#[derive(Debug)]
pub struct RequestPipeline {
    store: CredentialStore,
    transport: Arc<dyn Transport>,
    limiters: RateLimiters,
    retry_policy: RetryPolicy,
    request_ids: RequestIdGenerator,
    platform: String,
    app_version: String,
    request_timeout: Duration,
    events: broadcast::Sender<SessionEvent>,
}

// Verify RequestPipeline is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<RequestPipeline>();
};

impl RequestPipeline {
    /// Creates a pipeline from configuration, a credential store and a
    /// transport.
    #[must_use]
    pub fn new(config: &ClientConfig, store: CredentialStore, transport: Arc<dyn Transport>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            transport,
            limiters: RateLimiters::new(config.general_rate_limit(), config.auth_rate_limit()),
            retry_policy: config.retry_policy().clone(),
            request_ids: RequestIdGenerator,
            platform: config.platform().to_string(),
            app_version: config.app_version().to_string(),
            request_timeout: config.request_timeout(),
            events,
        }
    }

    /// Returns the credential store.
    #[must_use]
    pub const fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Returns the rate limiters.
    #[must_use]
    pub const fn limiters(&self) -> &RateLimiters {
        &self.limiters
    }

    /// Subscribes to session events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub(crate) fn notify(&self, event: SessionEvent) {
        debug!(?event, "Session event");
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Runs one logical call and returns the response's `data` object.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidOperation`] for an operation that fails
    /// [`Operation::verify`] and [`ClientError::RateLimited`] when the bucket
    /// is exhausted, both without touching the network or the limiter
    /// window. Every other failure is [`ClientError::Classified`].
    pub async fn execute(&self, operation: &Operation) -> Result<serde_json::Value, ClientError> {
        operation.verify()?;
        self.rate_check(operation).await?;

        let mut state = RetryState::new(&operation.name);
        loop {
            let context = self.build_context().await;
            let request_id = context.request_id.clone();
            debug!(
                operation = %operation.name,
                request_id = %request_id,
                attempt = state.attempt,
                "Sending request"
            );

            let failure = match self.send(operation, &context).await {
                Ok(data) => return Ok(data),
                Err(failure) => failure,
            };

            let error = classify(&failure, &operation.name);
            match self.decide(&error, &state, &request_id).await {
                Some(delay) => {
                    tokio::time::sleep(delay).await;
                    state.advance(delay);
                }
                None => return Err(error.into()),
            }
        }
    }

    async fn rate_check(&self, operation: &Operation) -> Result<(), RateLimitedError> {
        let key = match &operation.rate_limit_key {
            Some(key) => key.clone(),
            None => self
                .store
                .user_id()
                .await
                .unwrap_or_else(|| ANONYMOUS_KEY.to_string()),
        };

        let limiter = self.limiters.for_kind(operation.kind);
        if limiter.is_allowed(&key) {
            return Ok(());
        }

        let retry_after = limiter.retry_after(&key).unwrap_or_default();
        warn!(
            operation = %operation.name,
            bucket = operation.kind.bucket_name(),
            retry_after_ms = u64::try_from(retry_after.as_millis()).unwrap_or(u64::MAX),
            "Request refused by rate limiter"
        );
        Err(RateLimitedError {
            bucket: operation.kind.bucket_name(),
            key,
            retry_after,
        })
    }

    async fn build_context(&self) -> RequestContext {
        let token = self.store.get(TokenKind::Access).await;
        RequestContext::new(
            self.request_ids.generate(),
            &self.platform,
            &self.app_version,
            token.as_deref(),
        )
    }

    async fn send(
        &self,
        operation: &Operation,
        context: &RequestContext,
    ) -> Result<serde_json::Value, TransportFailure> {
        let request = TransportRequest {
            operation_name: operation.name.clone(),
            body: operation.to_body(),
            headers: context.to_headers(),
        };

        tokio::time::timeout(self.request_timeout, self.transport.send(request))
            .await
            .unwrap_or_else(|_| {
                Err(TransportFailure::Timeout {
                    after: self.request_timeout,
                })
            })
    }

    /// Returns the delay before the next attempt, or `None` to stop.
    async fn decide(
        &self,
        error: &ClassifiedError,
        state: &RetryState,
        request_id: &str,
    ) -> Option<Duration> {
        let decision = self.retry_policy.should_retry(error, state.attempt);

        if decision.invalidate_credentials {
            warn!(
                operation = %error.operation,
                request_id,
                "Session expired, clearing stored credentials"
            );
            self.store.clear_all().await;
            self.notify(SessionEvent::Expired {
                operation: error.operation.clone(),
            });
            return None;
        }

        if decision.retry {
            debug!(
                operation = %error.operation,
                request_id,
                attempt = state.attempt,
                kind = %error.kind,
                delay_ms = u64::try_from(decision.delay.as_millis()).unwrap_or(u64::MAX),
                "Retrying after failure"
            );
            return Some(decision.delay);
        }

        if error.retryable {
            warn!(
                operation = %error.operation,
                request_id,
                attempts = state.attempt + 1,
                kind = %error.kind,
                "Giving up after retries"
            );
        } else {
            debug!(
                operation = %error.operation,
                request_id,
                kind = %error.kind,
                "Request failed"
            );
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{ErrorKind, OperationKind, RateLimitConfig};
    use crate::config::{AppVersion, Endpoint};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct Scripted {
        outcomes: Mutex<VecDeque<Result<serde_json::Value, TransportFailure>>>,
        calls: Mutex<u32>,
    }

    impl Scripted {
        fn new(outcomes: Vec<Result<serde_json::Value, TransportFailure>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn send(&self, _request: TransportRequest) -> Result<serde_json::Value, TransportFailure> {
            *self.calls.lock().unwrap() += 1;
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(json!({})))
        }
    }

    fn config() -> ClientConfig {
        ClientConfig::builder()
            .endpoint(Endpoint::new("https://api.example.com/graphql").unwrap())
            .app_version(AppVersion::new("1.0.0").unwrap())
            .auth_rate_limit(RateLimitConfig::new(1, Duration::from_secs(60)))
            .build()
            .unwrap()
    }

    fn op() -> Operation {
        Operation::builder("GetCart", "query GetCart { cart { id } }")
            .build()
            .unwrap()
    }

    fn reset() -> TransportFailure {
        TransportFailure::Connect {
            message: "connection reset".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_failures_are_retried_until_success() {
        let transport = Scripted::new(vec![Err(reset()), Ok(json!({"cart": {"id": "c1"}}))]);
        let pipeline = RequestPipeline::new(&config(), CredentialStore::in_memory(), transport.clone());

        let data = pipeline.execute(&op()).await.unwrap();

        assert_eq!(data, json!({"cart": {"id": "c1"}}));
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_failures_stop_after_max_attempts() {
        let transport = Scripted::new(vec![Err(reset()), Err(reset()), Err(reset()), Err(reset())]);
        let pipeline = RequestPipeline::new(&config(), CredentialStore::in_memory(), transport.clone());

        let err = pipeline.execute(&op()).await.unwrap_err();

        assert_eq!(err.kind(), Some(ErrorKind::Network));
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_classified_as_network() {
        #[derive(Debug)]
        struct Hanging;

        #[async_trait]
        impl Transport for Hanging {
            async fn send(&self, _request: TransportRequest) -> Result<serde_json::Value, TransportFailure> {
                std::future::pending().await
            }
        }

        let pipeline = RequestPipeline::new(
            &config(),
            CredentialStore::in_memory(),
            Arc::new(Hanging),
        );

        let err = pipeline.execute(&op()).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Network));
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_bucket_refuses_without_transport_call() {
        let transport = Scripted::new(vec![]);
        let pipeline = RequestPipeline::new(&config(), CredentialStore::in_memory(), transport.clone());
        let sign_in = Operation::builder("SignIn", "mutation SignIn { signIn { accessToken } }")
            .kind(OperationKind::Auth)
            .rate_limit_key("user@example.com")
            .build()
            .unwrap();

        pipeline.execute(&sign_in).await.unwrap();
        let err = pipeline.execute(&sign_in).await.unwrap_err();

        assert!(err.is_rate_limited());
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_invalid_operation_is_rejected_before_rate_check() {
        let transport = Scripted::new(vec![]);
        let pipeline = RequestPipeline::new(&config(), CredentialStore::in_memory(), transport.clone());
        let mut blank = op();
        blank.query = "   ".to_string();

        let err = pipeline.execute(&blank).await.unwrap_err();

        assert!(matches!(
            err,
            ClientError::InvalidOperation(crate::clients::InvalidOperationError::EmptyQuery { .. })
        ));
        assert_eq!(err.kind(), None);
        assert_eq!(transport.calls(), 0);
        assert_eq!(pipeline.limiters().general().remaining(ANONYMOUS_KEY), 100);
    }

    #[tokio::test]
    async fn test_rate_key_falls_back_to_user_then_anonymous() {
        let store = CredentialStore::in_memory();
        let pipeline = RequestPipeline::new(&config(), store.clone(), Scripted::new(vec![]));

        pipeline.execute(&op()).await.unwrap();
        assert_eq!(pipeline.limiters().general().remaining(ANONYMOUS_KEY), 99);

        store.set_user_id("u-7").await.unwrap();
        pipeline.execute(&op()).await.unwrap();
        assert_eq!(pipeline.limiters().general().remaining("u-7"), 99);
        assert_eq!(pipeline.limiters().general().remaining(ANONYMOUS_KEY), 99);
    }
}
