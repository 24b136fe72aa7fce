//! Sign-in, sign-out and token refresh.
//!
//! The mutation documents belong to the caller; these helpers only know the
//! shape of the payload they return. The first root field of `data` must
//! carry the tokens:
//!
//! ```json
//! { "data": { "signIn": { "accessToken": "...", "refreshToken": "...", "user": { "id": "..." } } } }
//! ```
//!
//! `token` is accepted in place of `accessToken`. `refreshToken` and
//! `user.id` are optional.

use std::fmt;

use thiserror::Error;
use tracing::info;

use crate::auth::storage::StorageError;
use crate::auth::TokenKind;
use crate::clients::{ClientError, InvalidOperationError, Operation, OperationBuilder, OperationKind};
use crate::GraphqlClient;

/// Operation name used when the document does not name its mutation.
pub const DEFAULT_LOGIN_OPERATION: &str = "Login";

/// Operation name used when the document does not name its mutation.
pub const DEFAULT_REFRESH_OPERATION: &str = "RefreshSession";

/// Session lifecycle notifications.
///
/// Delivered through [`GraphqlClient::subscribe`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// Credentials were stored after a successful sign-in.
    LoggedIn {
        /// The signed-in user's id, when the backend returned one.
        user_id: Option<String>,
    },
    /// The user signed out and all stored keys were cleared.
    LoggedOut,
    /// The backend rejected the credentials and all stored keys were cleared.
    Expired {
        /// The operation that observed the rejection.
        operation: String,
    },
}

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The mutation failed in the pipeline.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The mutation document or its variables were rejected.
    #[error(transparent)]
    InvalidOperation(#[from] InvalidOperationError),

    /// The returned tokens could not be stored.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The response did not contain an access token.
    #[error("Response to '{operation}' did not contain an access token")]
    MissingToken {
        /// The operation whose payload was inspected.
        operation: String,
    },

    /// No refresh token is stored.
    #[error("No refresh token is stored; sign in again")]
    MissingRefreshToken,
}

/// Email and password for [`login`].
///
/// The `Debug` implementation masks the password.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    /// The account email, also used as the rate limit key.
    pub email: String,
    /// The account password.
    pub password: String,
}

impl LoginCredentials {
    /// Creates login credentials.
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .field("password", &"*****")
            .finish()
    }
}

#[derive(Debug, PartialEq, Eq)]
struct IssuedTokens {
    access_token: String,
    refresh_token: Option<String>,
    user_id: Option<String>,
}

/// Signs in and stores the issued tokens.
///
/// `mutation` receives `$email` and `$password`. The call is throttled
/// under the auth bucket, keyed by the email.
///
/// # Errors
///
/// Returns [`SessionError::Client`] if the call fails,
/// [`SessionError::MissingToken`] if the payload has no access token, and
/// [`SessionError::Storage`] if the tokens cannot be stored.
///
/// # Example
///
/// ```rust,ignore
/// use shop_api_client::auth::{login, LoginCredentials};
///
/// let mutation = "mutation SignIn($email: String!, $password: String!) {
///     signIn(email: $email, password: $password) { accessToken refreshToken user { id } }
/// }";
/// login(&client, mutation, &LoginCredentials::new("a@b.c", "hunter2")).await?;
/// ```
pub async fn login(
    client: &GraphqlClient,
    mutation: &str,
    credentials: &LoginCredentials,
) -> Result<(), SessionError> {
    let operation = auth_operation(mutation, DEFAULT_LOGIN_OPERATION)
        .variable("email", credentials.email.as_str())
        .variable("password", credentials.password.as_str())
        .rate_limit_key(credentials.email.as_str())
        .build()?;

    let data = client.execute(&operation).await?;
    let tokens = extract_tokens(&data, &operation.name)?;

    let store = client.credentials();
    store
        .set(&tokens.access_token, tokens.refresh_token.as_deref())
        .await?;
    if let Some(user_id) = &tokens.user_id {
        store.set_user_id(user_id).await?;
    }

    info!(operation = %operation.name, "Signed in");
    client.notify(SessionEvent::LoggedIn {
        user_id: tokens.user_id,
    });
    Ok(())
}

/// Clears every stored key and announces the sign-out.
pub async fn logout(client: &GraphqlClient) {
    client.credentials().clear_all().await;
    info!("Signed out");
    client.notify(SessionEvent::LoggedOut);
}

/// Exchanges the stored refresh token for a new token pair.
///
/// `mutation` receives `$refreshToken`. When the response omits a new
/// refresh token the stored one is kept.
///
/// # Errors
///
/// Returns [`SessionError::MissingRefreshToken`] when no refresh token is
/// stored, otherwise the same errors as [`login`].
pub async fn refresh_session(client: &GraphqlClient, mutation: &str) -> Result<(), SessionError> {
    let store = client.credentials();
    let refresh_token = store
        .get(TokenKind::Refresh)
        .await
        .ok_or(SessionError::MissingRefreshToken)?;

    let mut builder = auth_operation(mutation, DEFAULT_REFRESH_OPERATION)
        .variable("refreshToken", refresh_token);
    if let Some(user_id) = store.user_id().await {
        builder = builder.rate_limit_key(user_id);
    }
    let operation = builder.build()?;

    let data = client.execute(&operation).await?;
    let tokens = extract_tokens(&data, &operation.name)?;
    store
        .set(&tokens.access_token, tokens.refresh_token.as_deref())
        .await?;

    info!(operation = %operation.name, "Session refreshed");
    Ok(())
}

fn auth_operation(document: &str, fallback: &str) -> OperationBuilder {
    let name = mutation_name(document).unwrap_or(fallback);
    Operation::builder(name, document).kind(OperationKind::Auth)
}

/// Returns the name in `mutation Name(...)`, if the document has one.
fn mutation_name(document: &str) -> Option<&str> {
    let rest = document.trim_start().strip_prefix("mutation")?;
    let rest = rest.trim_start();
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    let name = &rest[..end];
    (!name.is_empty()).then_some(name)
}

fn extract_tokens(data: &serde_json::Value, operation: &str) -> Result<IssuedTokens, SessionError> {
    let payload = data
        .as_object()
        .and_then(|root| root.values().next())
        .filter(|payload| payload.is_object());

    let string_at = |field: &str| {
        payload
            .and_then(|p| p.get(field))
            .and_then(serde_json::Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let access_token = string_at("accessToken")
        .or_else(|| string_at("token"))
        .ok_or_else(|| SessionError::MissingToken {
            operation: operation.to_string(),
        })?;

    let user_id = payload
        .and_then(|p| p.pointer("/user/id"))
        .and_then(|id| match id {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        });

    Ok(IssuedTokens {
        access_token,
        refresh_token: string_at("refreshToken"),
        user_id,
    })
}
