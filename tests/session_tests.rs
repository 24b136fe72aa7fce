//! Integration tests for sign-in, sign-out and token refresh.

mod common;

use common::{client_with, config_builder, unauthenticated, ScriptedTransport};
use serde_json::json;
use shop_api_client::auth::{
    login, logout, refresh_session, CredentialStore, LoginCredentials, SessionError, SessionEvent,
    TokenKind,
};
use shop_api_client::{ClientError, OperationKind};

const SIGN_IN: &str = "mutation SignIn($email: String!, $password: String!) {
    signIn(email: $email, password: $password) { accessToken refreshToken user { id } }
}";

const REFRESH: &str = "mutation Refresh($refreshToken: String!) {
    refreshToken(refreshToken: $refreshToken) { accessToken refreshToken }
}";

#[tokio::test]
async fn test_login_stores_tokens_and_announces() {
    let transport = ScriptedTransport::new(vec![Ok(json!({
        "signIn": { "accessToken": "a1", "refreshToken": "r1", "user": { "id": "u-1" } }
    }))]);
    let store = CredentialStore::in_memory();
    let client = client_with(config_builder().build().unwrap(), store.clone(), transport.clone());
    let mut events = client.subscribe();

    login(&client, SIGN_IN, &LoginCredentials::new("shopper@example.com", "hunter2"))
        .await
        .unwrap();

    assert_eq!(store.get(TokenKind::Access).await.as_deref(), Some("a1"));
    assert_eq!(store.get(TokenKind::Refresh).await.as_deref(), Some("r1"));
    assert_eq!(store.user_id().await.as_deref(), Some("u-1"));
    assert_eq!(
        events.recv().await.unwrap(),
        SessionEvent::LoggedIn {
            user_id: Some("u-1".to_string())
        }
    );

    let request = &transport.requests()[0];
    assert_eq!(request.operation_name, "SignIn");
    assert_eq!(request.body["variables"]["email"], "shopper@example.com");
    assert_eq!(request.body["variables"]["password"], "hunter2");
}

#[tokio::test]
async fn test_login_is_throttled_by_auth_bucket_per_email() {
    let transport = ScriptedTransport::new(vec![Ok(json!({ "signIn": { "token": "a1" } }))]);
    let client = client_with(
        config_builder().build().unwrap(),
        CredentialStore::in_memory(),
        transport,
    );

    login(&client, SIGN_IN, &LoginCredentials::new("shopper@example.com", "pw"))
        .await
        .unwrap();

    let limiters = client.rate_limiters();
    assert_eq!(
        limiters
            .for_kind(OperationKind::Auth)
            .remaining("shopper@example.com"),
        4
    );
    assert_eq!(limiters.general().remaining("shopper@example.com"), 100);
}

#[tokio::test(start_paused = true)]
async fn test_sixth_login_for_same_email_is_rate_limited() {
    let transport = ScriptedTransport::new(
        (0..5)
            .map(|_| Ok(json!({ "signIn": { "accessToken": "a1" } })))
            .collect(),
    );
    let client = client_with(
        config_builder().build().unwrap(),
        CredentialStore::in_memory(),
        transport.clone(),
    );
    let credentials = LoginCredentials::new("shopper@example.com", "pw");

    for _ in 0..5 {
        login(&client, SIGN_IN, &credentials).await.unwrap();
    }
    let err = login(&client, SIGN_IN, &credentials).await.unwrap_err();

    match err {
        SessionError::Client(ClientError::RateLimited(e)) => {
            assert_eq!(e.bucket, "auth");
            assert_eq!(e.key, "shopper@example.com");
        }
        other => panic!("expected rate limit, got {other:?}"),
    }
    assert_eq!(transport.calls(), 5);
}

#[tokio::test]
async fn test_login_without_token_in_payload_fails() {
    let transport = ScriptedTransport::new(vec![Ok(json!({ "signIn": { "user": null } }))]);
    let store = CredentialStore::in_memory();
    let client = client_with(config_builder().build().unwrap(), store.clone(), transport);

    let err = login(&client, SIGN_IN, &LoginCredentials::new("a@b.c", "pw"))
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::MissingToken { .. }));
    assert!(store.credential().await.is_none());
}

#[tokio::test]
async fn test_login_rejected_surfaces_client_error() {
    let transport = ScriptedTransport::new(vec![Err(unauthenticated())]);
    let client = client_with(
        config_builder().build().unwrap(),
        CredentialStore::in_memory(),
        transport,
    );

    let err = login(&client, SIGN_IN, &LoginCredentials::new("a@b.c", "wrong"))
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::Client(ref e) if e.is_auth_expired()));
}

#[tokio::test]
async fn test_logout_clears_everything() {
    let store = CredentialStore::in_memory();
    store.set("a1", Some("r1")).await.unwrap();
    store.set_user_id("u-1").await.unwrap();
    store.set_biometric_enabled(true).await.unwrap();
    let client = client_with(
        config_builder().build().unwrap(),
        store.clone(),
        ScriptedTransport::new(vec![]),
    );
    let mut events = client.subscribe();

    logout(&client).await;

    assert!(store.credential().await.is_none());
    assert!(store.get(TokenKind::Refresh).await.is_none());
    assert!(store.user_id().await.is_none());
    assert!(!store.biometric_enabled().await);
    assert_eq!(events.recv().await.unwrap(), SessionEvent::LoggedOut);
}

#[tokio::test]
async fn test_refresh_sends_stored_refresh_token() {
    let transport = ScriptedTransport::new(vec![Ok(json!({
        "refreshToken": { "accessToken": "a2", "refreshToken": "r2" }
    }))]);
    let store = CredentialStore::in_memory();
    store.set("a1", Some("r1")).await.unwrap();
    let client = client_with(config_builder().build().unwrap(), store.clone(), transport.clone());

    refresh_session(&client, REFRESH).await.unwrap();

    let request = &transport.requests()[0];
    assert_eq!(request.operation_name, "Refresh");
    assert_eq!(request.body["variables"]["refreshToken"], "r1");
    assert_eq!(store.get(TokenKind::Access).await.as_deref(), Some("a2"));
    assert_eq!(store.get(TokenKind::Refresh).await.as_deref(), Some("r2"));
}

#[tokio::test]
async fn test_refresh_without_refresh_token_fails_early() {
    let transport = ScriptedTransport::new(vec![]);
    let store = CredentialStore::in_memory();
    store.set("a1", None).await.unwrap();
    let client = client_with(config_builder().build().unwrap(), store, transport.clone());

    let err = refresh_session(&client, REFRESH).await.unwrap_err();

    assert!(matches!(err, SessionError::MissingRefreshToken));
    assert_eq!(transport.calls(), 0);
}
