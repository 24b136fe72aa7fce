//! Transport seam between the request pipeline and the network.
//!
//! The pipeline treats the transport as a black box: it hands over a
//! [`TransportRequest`] and gets back either the decoded `data` object of a
//! GraphQL response or a raw [`TransportFailure`]. Classification of that
//! failure happens later, in [`classify`](crate::clients::classify).
//!
//! [`HttpTransport`] is the production implementation on top of `reqwest`.
//! Tests and embedders can supply their own [`Transport`].

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::config::{ClientConfig, Endpoint};
use crate::error::ConfigError;

/// Crate version from Cargo.toml.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// One outbound attempt, ready to be sent.
#[derive(Clone, Debug)]
pub struct TransportRequest {
    /// Name of the GraphQL operation.
    pub operation_name: String,
    /// JSON body: `query`, `variables` and `operationName`.
    pub body: serde_json::Value,
    /// Headers built for this attempt.
    pub headers: HashMap<String, String>,
}

/// A single error entry from a GraphQL `errors` array.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphqlErrorPayload {
    /// The error message.
    pub message: String,
    /// `extensions.code`, when the server supplied one.
    pub code: Option<String>,
}

impl<'de> Deserialize<'de> for GraphqlErrorPayload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Extensions {
            code: Option<String>,
        }

        #[derive(Deserialize)]
        struct Raw {
            #[serde(default)]
            message: String,
            extensions: Option<Extensions>,
        }

        let raw = Raw::deserialize(deserializer)?;
        Ok(Self {
            message: raw.message,
            code: raw.extensions.and_then(|e| e.code),
        })
    }
}

/// A raw, unclassified transport outcome.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportFailure {
    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// GraphQL errors found in the body, if it was a GraphQL response.
        errors: Vec<GraphqlErrorPayload>,
        /// Raw response body.
        body: String,
    },

    /// The server answered 2xx with a non-empty `errors` array.
    #[error("GraphQL errors: {}", join_messages(.errors))]
    Graphql {
        /// The reported errors.
        errors: Vec<GraphqlErrorPayload>,
    },

    /// The attempt did not complete in time.
    #[error("Request timed out after {after:?}")]
    Timeout {
        /// The timeout that elapsed.
        after: Duration,
    },

    /// The connection could not be established or was dropped.
    #[error("Connection failed: {message}")]
    Connect {
        /// Description of the failure.
        message: String,
    },

    /// The response could not be decoded.
    #[error("Invalid response: {message}")]
    Decode {
        /// Description of the failure.
        message: String,
    },

    /// Any other failure.
    #[error("{message}")]
    Other {
        /// Description of the failure.
        message: String,
    },
}

fn join_messages(errors: &[GraphqlErrorPayload]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl TransportFailure {
    fn from_reqwest(error: &reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            Self::Timeout { after: timeout }
        } else if error.is_connect() || error.is_request() || error.is_body() {
            Self::Connect {
                message: error.to_string(),
            }
        } else if error.is_decode() {
            Self::Decode {
                message: error.to_string(),
            }
        } else {
            Self::Other {
                message: error.to_string(),
            }
        }
    }
}

/// Sends one attempt to the GraphQL backend.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Sends the request and returns the response's `data` object.
    ///
    /// # Errors
    ///
    /// Returns the raw [`TransportFailure`]; the caller classifies it.
    async fn send(&self, request: TransportRequest) -> Result<serde_json::Value, TransportFailure>;
}

/// Splits a decoded GraphQL response into `data` or the reported errors.
///
/// Any non-empty `errors` array fails the attempt, even alongside partial
/// data. A response without `data` is a decode failure.
///
/// # Errors
///
/// Returns [`TransportFailure::Graphql`] or [`TransportFailure::Decode`].
pub fn interpret_response(mut body: serde_json::Value) -> Result<serde_json::Value, TransportFailure> {
    let errors = parse_errors(&body);
    if !errors.is_empty() {
        return Err(TransportFailure::Graphql { errors });
    }

    match body.get_mut("data").map(serde_json::Value::take) {
        Some(data) if !data.is_null() => Ok(data),
        _ => Err(TransportFailure::Decode {
            message: "response contains neither data nor errors".to_string(),
        }),
    }
}

fn parse_errors(body: &serde_json::Value) -> Vec<GraphqlErrorPayload> {
    body.get("errors")
        .and_then(|errors| Vec::<GraphqlErrorPayload>::deserialize(errors).ok())
        .unwrap_or_default()
}

/// HTTP transport for the GraphQL endpoint.
///
/// Adds `User-Agent` and `Accept` headers to every attempt and applies the
/// configured request timeout at the `reqwest` level.
///
/// # Thread Safety
///
/// `HttpTransport` is `Send + Sync`, making it safe to share across async tasks.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: Endpoint,
    timeout: Duration,
    default_headers: HashMap<String, String>,
}

// Verify HttpTransport is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<HttpTransport>();
};

impl HttpTransport {
    /// Creates a transport for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::TransportInit`] if the TLS backend cannot be
    /// initialized.
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let user_agent_prefix = config
            .user_agent_prefix()
            .map_or(String::new(), |prefix| format!("{prefix} | "));
        let rust_version = env!("CARGO_PKG_RUST_VERSION");
        let user_agent =
            format!("{user_agent_prefix}Shop API Client v{SDK_VERSION} | Rust {rust_version}");

        let mut default_headers = HashMap::new();
        default_headers.insert("User-Agent".to_string(), user_agent);
        default_headers.insert("Accept".to_string(), "application/json".to_string());

        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ConfigError::TransportInit {
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint().clone(),
            timeout: config.request_timeout(),
            default_headers,
        })
    }

    /// Returns the endpoint this transport posts to.
    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Returns the headers added to every attempt.
    #[must_use]
    pub const fn default_headers(&self) -> &HashMap<String, String> {
        &self.default_headers
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<serde_json::Value, TransportFailure> {
        let mut builder = self.client.post(self.endpoint.as_ref());
        for (key, value) in self.default_headers.iter().chain(request.headers.iter()) {
            builder = builder.header(key, value);
        }

        let res = builder
            .body(request.body.to_string())
            .send()
            .await
            .map_err(|e| TransportFailure::from_reqwest(&e, self.timeout))?;

        let status = res.status().as_u16();
        let body_text = res
            .text()
            .await
            .map_err(|e| TransportFailure::from_reqwest(&e, self.timeout))?;

        if !(200..300).contains(&status) {
            let errors = serde_json::from_str::<serde_json::Value>(&body_text)
                .map(|body| parse_errors(&body))
                .unwrap_or_default();
            tracing::debug!(
                operation = %request.operation_name,
                status,
                "GraphQL endpoint returned non-success status"
            );
            return Err(TransportFailure::Http {
                status,
                errors,
                body: body_text,
            });
        }

        let body: serde_json::Value =
            serde_json::from_str(&body_text).map_err(|e| TransportFailure::Decode {
                message: e.to_string(),
            })?;
        interpret_response(body)
    }
}
