//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use shop_api_client::auth::{
    CredentialBackend, CredentialStore, MemoryBackend, StorageError, StorageKey,
};
use shop_api_client::clients::{Transport, TransportFailure, TransportRequest};
use shop_api_client::{AppVersion, ClientConfig, ClientConfigBuilder, Endpoint, GraphqlClient};

pub type Outcome = Result<serde_json::Value, TransportFailure>;

/// Transport that replays scripted outcomes and records every request.
///
/// Once the script runs out it answers with an empty `data` object.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    outcomes: Mutex<VecDeque<Outcome>>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl ScriptedTransport {
    pub fn new(outcomes: Vec<Outcome>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: TransportRequest) -> Outcome {
        self.requests.lock().unwrap().push(request);
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(serde_json::json!({})))
    }
}

/// Memory backend that counts deletes of the access token.
#[derive(Debug, Default)]
pub struct CountingBackend {
    inner: MemoryBackend,
    access_deletes: AtomicU32,
}

impl CountingBackend {
    pub fn access_deletes(&self) -> u32 {
        self.access_deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialBackend for CountingBackend {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn read(&self, key: StorageKey) -> Result<Option<String>, StorageError> {
        self.inner.read(key).await
    }

    async fn write(&self, key: StorageKey, value: &str) -> Result<(), StorageError> {
        self.inner.write(key, value).await
    }

    async fn delete(&self, key: StorageKey) -> Result<(), StorageError> {
        if key == StorageKey::AuthToken {
            self.access_deletes.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.delete(key).await
    }
}

pub fn config_builder() -> ClientConfigBuilder {
    ClientConfig::builder()
        .endpoint(Endpoint::new("https://api.example.com/graphql").unwrap())
        .app_version(AppVersion::new("2.4.0").unwrap())
}

pub fn client_with(
    config: ClientConfig,
    store: CredentialStore,
    transport: Arc<ScriptedTransport>,
) -> GraphqlClient {
    GraphqlClient::with_parts(config, store, transport)
}

pub fn unauthenticated() -> TransportFailure {
    TransportFailure::Http {
        status: 401,
        errors: Vec::new(),
        body: r#"{"errors":[{"message":"Unauthorized"}]}"#.to_string(),
    }
}

pub fn timed_out() -> TransportFailure {
    TransportFailure::Timeout {
        after: std::time::Duration::from_secs(30),
    }
}
