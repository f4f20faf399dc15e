//! Lifetime of the cached provider client across configuration changes.

mod common;

use std::sync::Arc;

use common::{FakeCloud, TestEngine, ROOT_CLIENT_ID};
use hcp_secrets::{
    engine::{ConfigStore, RootConfigPatch},
    errors::Error,
};

fn configs(engine: &TestEngine) -> ConfigStore {
    ConfigStore::new(Arc::new(engine.store.clone()))
}

#[tokio::test]
async fn test_resolve_reuses_cached_handle() {
    let engine = TestEngine::configured().await;
    let client = engine.backend.provider_client();
    let configs = configs(&engine);

    let first = client.resolve(&configs).await.unwrap();
    let second = client.resolve(&configs).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(client.build_count(), 1);
    assert_eq!(engine.factory.connects(), 1);
}

#[tokio::test]
async fn test_patch_root_forces_rebuild() {
    let engine = TestEngine::configured().await;
    let client = engine.backend.provider_client();
    let configs = configs(&engine);
    let first = client.resolve(&configs).await.unwrap();

    engine
        .backend
        .patch_root(RootConfigPatch { organization: Some("O2".into()), ..Default::default() })
        .await
        .unwrap();
    assert!(!client.is_cached().await);

    let second = client.resolve(&configs).await.unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(client.build_count(), 2);
}

#[tokio::test]
async fn test_configure_and_delete_invalidate() {
    let engine = TestEngine::configured().await;
    let client = engine.backend.provider_client();
    let configs = configs(&engine);

    client.resolve(&configs).await.unwrap();
    engine.backend.configure_root(FakeCloud::root_config()).await.unwrap();
    assert!(!client.is_cached().await);

    client.resolve(&configs).await.unwrap();
    engine.backend.delete_root().await.unwrap();
    assert!(!client.is_cached().await);
}

#[tokio::test]
async fn test_invalidate_only_reacts_to_config_key() {
    let engine = TestEngine::configured().await;
    let client = engine.backend.provider_client();
    client.resolve(&configs(&engine)).await.unwrap();

    engine.backend.invalidate("roles/deployer").await;
    assert!(client.is_cached().await);

    engine.backend.invalidate("config").await;
    assert!(!client.is_cached().await);
}

#[tokio::test]
async fn test_concurrent_resolves_build_once() {
    let engine = TestEngine::configured().await;
    let client = Arc::clone(engine.backend.provider_client());
    let configs = configs(&engine);

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let client = Arc::clone(&client);
            let configs = configs.clone();
            tokio::spawn(async move { client.resolve(&configs).await.map(|_| ()) })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(client.build_count(), 1);
    assert_eq!(engine.factory.connects(), 1);
}

#[tokio::test]
async fn test_resolve_without_config_fails_authentication() {
    let engine = TestEngine::new(FakeCloud::new());

    let err = engine.backend.provider_client().resolve(&configs(&engine)).await.err().unwrap();

    assert!(matches!(err, Error::Authentication { .. }));
    assert!(!engine.backend.provider_client().is_cached().await);
}

#[tokio::test]
async fn test_failed_build_is_not_cached() {
    let engine = TestEngine::configured().await;
    engine
        .backend
        .patch_root(RootConfigPatch { client_secret: Some("wrong".into()), ..Default::default() })
        .await
        .unwrap();
    let client = engine.backend.provider_client();

    assert!(client.resolve(&configs(&engine)).await.is_err());
    assert!(!client.is_cached().await);

    engine
        .backend
        .patch_root(RootConfigPatch {
            client_id: Some(ROOT_CLIENT_ID.into()),
            client_secret: Some(common::ROOT_SECRET.into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(client.resolve(&configs(&engine)).await.is_ok());
    assert_eq!(client.build_count(), 1);
}

#[tokio::test]
async fn test_revoked_root_key_drops_cached_handle() {
    let engine = TestEngine::configured().await;
    engine.backend.put_role("ci", "viewer", None, None).await.unwrap();
    let client = engine.backend.provider_client();
    client.resolve(&configs(&engine)).await.unwrap();

    engine.cloud.revoke_key(ROOT_CLIENT_ID);
    let err = engine.backend.issue_credential("ci").await.unwrap_err();

    assert!(matches!(err, Error::Authentication { ref message } if message.contains("create-principal")));
    assert!(!client.is_cached().await);
    assert_eq!(engine.cloud.principal_names().len(), 1);

    // The next call rebuilds from config and fails at connect
    let err = engine.backend.issue_credential("ci").await.unwrap_err();
    assert!(matches!(err, Error::Authentication { ref message } if message.contains("no valid credentials")));
    assert_eq!(engine.factory.connects(), 1);
}
