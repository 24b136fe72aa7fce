//! Integration tests for credential storage backends.

mod common;

use common::config_builder;
use shop_api_client::auth::{CredentialStore, FileBackend, StorageKey, TokenKind};

#[tokio::test]
async fn test_file_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    let store = CredentialStore::new(FileBackend::new(dir.path()));
    store.set("a1", Some("r1")).await.unwrap();
    store.set_user_id("u-1").await.unwrap();
    store.set_pin("1357").await.unwrap();
    let device_id = store.device_id().await.unwrap();
    drop(store);

    let reopened = CredentialStore::new(FileBackend::new(dir.path()));
    assert_eq!(reopened.get(TokenKind::Access).await.as_deref(), Some("a1"));
    assert_eq!(reopened.get(TokenKind::Refresh).await.as_deref(), Some("r1"));
    assert_eq!(reopened.user_id().await.as_deref(), Some("u-1"));
    assert_eq!(reopened.device_id().await.unwrap(), device_id);
    assert!(reopened.verify_pin("1357").await);
}

#[tokio::test]
async fn test_file_store_clear_all_empties_document() {
    let dir = tempfile::tempdir().unwrap();
    let store = CredentialStore::new(FileBackend::new(dir.path()));
    store.set("a1", Some("r1")).await.unwrap();
    store.set_biometric_enabled(true).await.unwrap();

    store.clear_all().await;

    let raw = std::fs::read_to_string(dir.path().join("credentials.json")).unwrap();
    let document: serde_json::Value = serde_json::from_str(&raw).unwrap();
    for key in StorageKey::ALL {
        assert!(document.get(key.as_str()).is_none(), "{key} survived");
    }
}

#[tokio::test]
async fn test_platform_default_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_builder()
        .storage_service("shop-api-client-integration-test")
        .storage_dir(dir.path())
        .build()
        .unwrap();

    let store = CredentialStore::platform_default(&config).await;
    store.set("a1", Some("r1")).await.unwrap();
    assert_eq!(
        store.credential().await.map(|c| c.access_token).as_deref(),
        Some("a1")
    );

    store.clear_all().await;
    assert!(store.get(TokenKind::Access).await.is_none());
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_platform_default_falls_back_to_file_without_secure_store() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_builder().storage_dir(dir.path()).build().unwrap();

    let store = CredentialStore::platform_default(&config).await;

    assert_eq!(store.backend_name(), "file");
}
