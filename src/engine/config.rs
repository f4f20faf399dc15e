//! Root configuration: provider scope plus the credential the engine itself
//! authenticates with. Stored under the single `config` key.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::errors::{Error, Result};
use crate::provider::ProviderCredentials;
use crate::storage::{get_json, put_json, KeyValueStore};
use crate::types::{serialize_exposed, SecretString};

pub const CONFIG_KEY: &str = "config";

/// Persisted root configuration. All four fields are non-empty once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootConfig {
    #[serde(rename = "organization")]
    pub organization_id: String,
    #[serde(rename = "project")]
    pub project_id: String,
    pub client_id: String,
    #[serde(serialize_with = "serialize_exposed")]
    pub client_secret: SecretString,
}

impl RootConfig {
    pub fn new(
        organization_id: impl Into<String>,
        project_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<SecretString>,
    ) -> Self {
        Self {
            organization_id: organization_id.into(),
            project_id: project_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("organization", self.organization_id.is_empty()),
            ("project", self.project_id.is_empty()),
            ("client_id", self.client_id.is_empty()),
            ("client_secret", self.client_secret.is_empty()),
        ];
        match fields.iter().find(|(_, empty)| *empty) {
            Some((field, _)) => Err(Error::validation_field(format!("{} is empty", field), *field)),
            None => Ok(()),
        }
    }

    pub fn credentials(&self) -> ProviderCredentials {
        ProviderCredentials {
            organization_id: self.organization_id.clone(),
            project_id: self.project_id.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
        }
    }

    /// Caller-facing view, secret withheld.
    pub fn view(&self) -> RootConfigView {
        RootConfigView {
            organization: self.organization_id.clone(),
            project: self.project_id.clone(),
            client_id: self.client_id.clone(),
        }
    }

    fn apply(&mut self, patch: RootConfigPatch) {
        fn take(target: &mut String, value: Option<String>) {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                *target = value;
            }
        }

        take(&mut self.organization_id, patch.organization);
        take(&mut self.project_id, patch.project);
        take(&mut self.client_id, patch.client_id);
        if let Some(secret) = patch.client_secret.filter(|s| !s.is_empty()) {
            self.client_secret = secret;
        }
    }
}

/// Partial update. Absent or empty fields leave the stored value alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RootConfigPatch {
    pub organization: Option<String>,
    pub project: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
}

/// What a config read returns. Carries no secret.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootConfigView {
    pub organization: String,
    pub project: String,
    pub client_id: String,
}

/// Reads and writes [`RootConfig`]. Callers invalidate the provider client
/// after every mutation.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    store: Arc<dyn KeyValueStore>,
}

impl ConfigStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// `None` when the engine was never configured.
    pub async fn get(&self) -> Result<Option<RootConfig>> {
        get_json(self.store.as_ref(), CONFIG_KEY).await
    }

    /// Like [`get`](Self::get) but reports absence as `ConfigurationMissing`.
    pub async fn require(&self) -> Result<RootConfig> {
        self.get().await?.ok_or(Error::ConfigurationMissing)
    }

    pub async fn save(&self, config: &RootConfig) -> Result<()> {
        config.validate()?;
        put_json(self.store.as_ref(), CONFIG_KEY, config).await
    }

    /// Overwrite only the supplied non-empty fields of the stored config.
    pub async fn patch(&self, patch: RootConfigPatch) -> Result<RootConfig> {
        let mut config = self.require().await?;
        config.apply(patch);
        put_json(self.store.as_ref(), CONFIG_KEY, &config).await?;
        Ok(config)
    }

    pub async fn delete(&self) -> Result<()> {
        self.store.delete(CONFIG_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn store() -> (MemoryStore, ConfigStore) {
        let backing = MemoryStore::new();
        let configs = ConfigStore::new(Arc::new(backing.clone()));
        (backing, configs)
    }

    #[tokio::test]
    async fn test_save_writes_compatible_record() {
        let (backing, configs) = store();
        configs.save(&RootConfig::new("o1", "p1", "a", "s")).await.unwrap();

        let raw = backing.get(CONFIG_KEY).await.unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "organization": "o1",
                "project": "p1",
                "client_id": "a",
                "client_secret": "s"
            })
        );
    }

    #[tokio::test]
    async fn test_save_rejects_empty_fields() {
        let (backing, configs) = store();
        let err = configs.save(&RootConfig::new("o1", "", "a", "s")).await.unwrap_err();
        assert!(matches!(err, Error::Validation { field: Some(ref f), .. } if f == "project"));

        let err = configs.save(&RootConfig::new("o1", "p1", "a", "")).await.unwrap_err();
        assert!(err.to_string().contains("client_secret is empty"));
        assert!(backing.is_empty().await);
    }

    #[tokio::test]
    async fn test_patch_overwrites_only_non_empty_fields() {
        let (_, configs) = store();
        configs.save(&RootConfig::new("o1", "p1", "a", "s")).await.unwrap();

        let patched = configs
            .patch(RootConfigPatch {
                client_id: Some("b".into()),
                project: Some(String::new()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(patched, RootConfig::new("o1", "p1", "b", "s"));
        assert_eq!(configs.get().await.unwrap(), Some(patched));
    }

    #[tokio::test]
    async fn test_patch_requires_existing_config() {
        let (_, configs) = store();
        let err = configs.patch(RootConfigPatch::default()).await.unwrap_err();
        assert!(matches!(err, Error::ConfigurationMissing));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (_, configs) = store();
        configs.delete().await.unwrap();
        configs.save(&RootConfig::new("o1", "p1", "a", "s")).await.unwrap();
        configs.delete().await.unwrap();
        assert!(configs.get().await.unwrap().is_none());
        assert!(matches!(configs.require().await, Err(Error::ConfigurationMissing)));
    }

    #[test]
    fn test_view_has_no_secret() {
        let view = RootConfig::new("o1", "p1", "a", "s").view();
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json, serde_json::json!({"organization": "o1", "project": "p1", "client_id": "a"}));
    }
}
