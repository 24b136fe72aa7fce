//! Maps raw transport outcomes onto the failure taxonomy.
//!
//! [`classify`] is a pure function: the same failure always yields the same
//! [`ClassifiedError`], with no I/O and no side effects. Credential
//! invalidation for [`ErrorKind::AuthExpired`] is performed by the pipeline,
//! not here.
//!
//! # Rules
//!
//! | Input | Kind |
//! |---|---|
//! | HTTP 401, or a GraphQL error coded `UNAUTHENTICATED`, `UNAUTHORIZED`, `INVALID_TOKEN`, `TOKEN_EXPIRED` | `AuthExpired` |
//! | Timeout, connection failure, HTTP 408/502/503/504 | `Network` |
//! | Other GraphQL errors, HTTP 400/404/422 | `GraphqlValidation` |
//! | Anything else | `Unknown` |
//!
//! An auth signal anywhere in the failure takes precedence over every other
//! rule.

use crate::clients::errors::{ClassifiedError, ErrorKind};
use crate::clients::transport::{GraphqlErrorPayload, TransportFailure};

const AUTH_CODES: &[&str] = &[
    "UNAUTHENTICATED",
    "UNAUTHORIZED",
    "INVALID_TOKEN",
    "TOKEN_EXPIRED",
];

// Server-side faults reported through the GraphQL errors array.
const SERVER_FAULT_CODES: &[&str] = &["INTERNAL_SERVER_ERROR"];

/// Classifies one failed attempt of `operation`.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use shop_api_client::clients::{classify, ErrorKind, TransportFailure};
///
/// let error = classify(
///     &TransportFailure::Timeout { after: Duration::from_secs(30) },
///     "GetCart",
/// );
/// assert_eq!(error.kind, ErrorKind::Network);
/// assert!(error.retryable);
/// ```
#[must_use]
pub fn classify(failure: &TransportFailure, operation: &str) -> ClassifiedError {
    let message = failure.to_string();
    match failure {
        TransportFailure::Http { status, errors, .. } => {
            let kind = classify_status(*status, errors).unwrap_or(ErrorKind::Unknown);
            ClassifiedError::new(kind, message, operation).with_status(*status)
        }
        TransportFailure::Graphql { errors } => {
            ClassifiedError::new(classify_graphql(errors), message, operation)
        }
        TransportFailure::Timeout { .. } | TransportFailure::Connect { .. } => {
            ClassifiedError::new(ErrorKind::Network, message, operation)
        }
        TransportFailure::Decode { .. } | TransportFailure::Other { .. } => {
            ClassifiedError::new(ErrorKind::Unknown, message, operation)
        }
    }
}

fn classify_status(status: u16, errors: &[GraphqlErrorPayload]) -> Option<ErrorKind> {
    if status == 401 || has_auth_code(errors) {
        return Some(ErrorKind::AuthExpired);
    }
    match status {
        408 | 502 | 503 | 504 => Some(ErrorKind::Network),
        400 | 404 | 422 => Some(ErrorKind::GraphqlValidation),
        _ => None,
    }
}

fn classify_graphql(errors: &[GraphqlErrorPayload]) -> ErrorKind {
    if has_auth_code(errors) {
        ErrorKind::AuthExpired
    } else if errors.iter().any(|e| code_in(e, SERVER_FAULT_CODES)) {
        ErrorKind::Unknown
    } else {
        ErrorKind::GraphqlValidation
    }
}

fn has_auth_code(errors: &[GraphqlErrorPayload]) -> bool {
    errors.iter().any(|e| code_in(e, AUTH_CODES))
}

fn code_in(error: &GraphqlErrorPayload, codes: &[&str]) -> bool {
    error
        .code
        .as_deref()
        .is_some_and(|code| codes.iter().any(|c| c.eq_ignore_ascii_case(code)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn gql(code: Option<&str>) -> GraphqlErrorPayload {
        GraphqlErrorPayload {
            message: "error".to_string(),
            code: code.map(String::from),
        }
    }

    fn http(status: u16, errors: Vec<GraphqlErrorPayload>) -> TransportFailure {
        TransportFailure::Http {
            status,
            errors,
            body: String::new(),
        }
    }

    #[test]
    fn test_http_401_is_auth_expired() {
        let error = classify(&http(401, vec![]), "GetCart");
        assert_eq!(error.kind, ErrorKind::AuthExpired);
        assert!(!error.retryable);
        assert_eq!(error.status, Some(401));
        assert_eq!(error.operation, "GetCart");
    }

    #[test]
    fn test_unauthenticated_graphql_code_is_auth_expired() {
        let failure = TransportFailure::Graphql {
            errors: vec![gql(Some("unauthenticated"))],
        };
        assert_eq!(classify(&failure, "op").kind, ErrorKind::AuthExpired);
    }

    #[test]
    fn test_auth_signal_wins_over_other_errors() {
        let failure = TransportFailure::Graphql {
            errors: vec![gql(Some("BAD_USER_INPUT")), gql(Some("TOKEN_EXPIRED"))],
        };
        assert_eq!(classify(&failure, "op").kind, ErrorKind::AuthExpired);

        // Auth code inside a non-401 HTTP failure
        let failure = http(500, vec![gql(Some("UNAUTHENTICATED"))]);
        assert_eq!(classify(&failure, "op").kind, ErrorKind::AuthExpired);
    }

    #[test]
    fn test_connection_failures_are_network() {
        let timeout = TransportFailure::Timeout {
            after: Duration::from_secs(30),
        };
        let reset = TransportFailure::Connect {
            message: "connection reset by peer".to_string(),
        };
        for failure in [timeout, reset] {
            let error = classify(&failure, "op");
            assert_eq!(error.kind, ErrorKind::Network);
            assert!(error.retryable);
        }
    }

    #[test]
    fn test_gateway_statuses_are_network() {
        for status in [408, 502, 503, 504] {
            assert_eq!(
                classify(&http(status, vec![]), "op").kind,
                ErrorKind::Network,
                "status {status}"
            );
        }
    }

    #[test]
    fn test_backend_validation_errors() {
        let failure = TransportFailure::Graphql {
            errors: vec![gql(Some("BAD_USER_INPUT"))],
        };
        let error = classify(&failure, "op");
        assert_eq!(error.kind, ErrorKind::GraphqlValidation);
        assert!(!error.retryable);

        let uncoded = TransportFailure::Graphql {
            errors: vec![gql(None)],
        };
        assert_eq!(classify(&uncoded, "op").kind, ErrorKind::GraphqlValidation);

        for status in [400, 404, 422] {
            assert_eq!(
                classify(&http(status, vec![]), "op").kind,
                ErrorKind::GraphqlValidation
            );
        }
    }

    #[test]
    fn test_unrecognized_failures_fail_closed() {
        let cases = [
            http(500, vec![]),
            http(403, vec![]),
            http(429, vec![]),
            TransportFailure::Graphql {
                errors: vec![gql(Some("INTERNAL_SERVER_ERROR"))],
            },
            TransportFailure::Decode {
                message: "eof".to_string(),
            },
            TransportFailure::Other {
                message: "???".to_string(),
            },
        ];
        for failure in cases {
            let error = classify(&failure, "op");
            assert_eq!(error.kind, ErrorKind::Unknown, "{failure:?}");
            assert!(!error.retryable);
        }
    }

    #[test]
    fn test_classification_is_deterministic() {
        let failure = http(401, vec![]);
        assert_eq!(classify(&failure, "op"), classify(&failure, "op"));
    }
}
