//! # Storage
//!
//! Key/value persistence for the engine's own state. The engine only needs
//! per-key atomic get/put/delete and an ordered prefix listing; durability is
//! the backend's concern.
//!
//! Logical layout:
//! - `config` holds the root configuration record
//! - `roles/<name>` holds one role record per role

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::errors::{Error, Result};

pub use memory::MemoryStore;
pub use sqlite::{SqliteStore, SqliteStoreConfig};

/// Storage abstraction used by the config and role stores.
///
/// `list` returns the keys under `prefix` with the prefix stripped, ordered
/// lexicographically. Only the next path segment is returned: a key nested
/// deeper shows up once as `<segment>/`.
#[async_trait]
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Encode a record as JSON and write it under `key`.
pub async fn put_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value)
        .map_err(|e| Error::serialization(format!("failed to encode '{}'", key), e))?;
    store.put(key, bytes).await
}

/// Read and decode the JSON record under `key`.
pub async fn get_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    match store.get(key).await? {
        Some(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| Error::serialization(format!("failed to decode '{}'", key), e)),
        None => Ok(None),
    }
}

/// Collapse a sorted list of full keys into the listing seen under `prefix`.
pub(crate) fn list_children<'a, I>(prefix: &str, keys: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut children: Vec<String> = Vec::new();
    for key in keys {
        let Some(rest) = key.strip_prefix(prefix) else {
            continue;
        };
        let child = match rest.find('/') {
            Some(idx) => &rest[..=idx],
            None => rest,
        };
        if child.is_empty() {
            continue;
        }
        if children.last().map(String::as_str) != Some(child) {
            children.push(child.to_string());
        }
    }
    children
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_children_strips_prefix_and_folds_folders() {
        let keys = ["config", "roles/admin", "roles/nested/a", "roles/nested/b", "roles/viewer"];
        let listed = list_children("roles/", keys.iter().copied());
        assert_eq!(listed, vec!["admin", "nested/", "viewer"]);
    }

    #[test]
    fn test_list_children_empty_prefix_lists_top_level() {
        let keys = ["config", "roles/admin"];
        assert_eq!(list_children("", keys.iter().copied()), vec!["config", "roles/"]);
    }

    #[tokio::test]
    async fn test_json_helpers_round_trip_through_store() {
        let store = MemoryStore::new();
        put_json(&store, "roles/a", &serde_json::json!({"name": "a"})).await.unwrap();

        let value: Option<serde_json::Value> = get_json(&store, "roles/a").await.unwrap();
        assert_eq!(value.unwrap()["name"], "a");

        let missing: Option<serde_json::Value> = get_json(&store, "roles/b").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_get_json_reports_undecodable_records() {
        let store = MemoryStore::new();
        store.put("config", b"not json".to_vec()).await.unwrap();

        let err = get_json::<serde_json::Value>(&store, "config").await.unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
    }
}
