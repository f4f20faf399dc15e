//! # Root Credential Rotation
//!
//! Replaces the key material of the engine's own credential without changing
//! the principal it authenticates as. The phases run in a fixed order within
//! a single call and nothing about an in-flight rotation is persisted:
//!
//! 1. **identify**: ask the provider who we are and find the key backing the
//!    configured `client_id`
//! 2. **mint**: create a second key under the same principal
//! 3. **swap**: store the new key as the root credential and drop the cached
//!    provider client (the commit point)
//! 4. **retire**: delete the old key through a client built from the new one
//!
//! A valid credential is configured at every point of the sequence. If the
//! process stops after the swap, the only residue is the old key, which still
//! works and is harmless.
//!
//! A failed retire does not fail the rotation: the credential has already
//! changed and running the whole rotation again would mint yet another key.
//! The stale key is logged and returned in the [`RotationReport`].

use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::config::{ConfigStore, RootConfigPatch};
use crate::errors::{Error, Result};
use crate::provider::{ProviderClient, ProviderStep, ServicePrincipalKey};

/// Old key left behind because the retire phase failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleKey {
    pub resource_name: String,
    pub client_id: String,
    pub reason: String,
}

/// Outcome of a committed rotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RotationReport {
    pub principal: String,
    pub new_client_id: String,
    pub retired_client_id: String,
    pub stale_key: Option<StaleKey>,
}

impl RotationReport {
    /// Human readable warnings for the caller, empty on a clean rotation.
    pub fn warnings(&self) -> Vec<String> {
        self.stale_key
            .iter()
            .map(|stale| {
                format!(
                    "credential rotated, but the previous key {} (client_id {}) could not be deleted: {}",
                    stale.resource_name, stale.client_id, stale.reason
                )
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct RootRotator {
    configs: ConfigStore,
    client: Arc<ProviderClient>,
}

impl RootRotator {
    pub fn new(configs: ConfigStore, client: Arc<ProviderClient>) -> Self {
        Self { configs, client }
    }

    pub async fn rotate(&self) -> Result<RotationReport> {
        let config = self.configs.require().await?;
        let provider = self.client.resolve(&self.configs).await?;

        // identify
        let principal = provider.whoami().await.map_err(|e| {
            error!(error = %e, "Failed to resolve caller identity");
            Error::provider(ProviderStep::CallerIdentity, e)
        })?;
        let details = provider.get_principal(&principal.resource_name).await.map_err(|e| {
            error!(principal = %principal.resource_name, error = %e, "Failed to list principal keys");
            Error::provider_for(ProviderStep::ListKeys, principal.resource_name.as_str(), e)
        })?;
        let current = details.key_for_client(&config.client_id).cloned().ok_or_else(|| {
            error!(
                principal = %principal.resource_name,
                client_id = %config.client_id,
                "Configured client_id does not match any key of the calling principal"
            );
            Error::IdentityResolution { client_id: config.client_id.clone() }
        })?;
        info!(principal = %principal.resource_name, key = %current.resource_name, "Rotation: identified current key");

        // mint
        let minted = provider.create_key(&principal.resource_name).await.map_err(|e| {
            error!(principal = %principal.resource_name, error = %e, "Failed to mint replacement key");
            Error::provider_for(ProviderStep::CreateKey, principal.resource_name.as_str(), e)
        })?;
        info!(client_id = %minted.key.client_id, "Rotation: minted replacement key");

        // swap
        let patch = RootConfigPatch {
            client_id: Some(minted.key.client_id.clone()),
            client_secret: Some(minted.client_secret.clone()),
            ..Default::default()
        };
        if let Err(e) = self.configs.patch(patch).await {
            warn!(
                key = %minted.key.resource_name,
                client_id = %minted.key.client_id,
                "Replacement key is unused because the configuration write failed; delete it manually"
            );
            return Err(e);
        }
        self.client.invalidate().await;
        info!(client_id = %minted.key.client_id, "Rotation: root credential swapped");

        // retire
        let stale_key = match self.retire(&current).await {
            Ok(()) => {
                info!(key = %current.resource_name, "Rotation: previous key deleted");
                None
            }
            Err(e) => {
                warn!(
                    key = %current.resource_name,
                    client_id = %current.client_id,
                    error = %e,
                    "Previous root key could not be deleted and is still live; delete it manually"
                );
                Some(StaleKey {
                    resource_name: current.resource_name.clone(),
                    client_id: current.client_id.clone(),
                    reason: e.to_string(),
                })
            }
        };

        Ok(RotationReport {
            principal: principal.resource_name,
            new_client_id: minted.key.client_id,
            retired_client_id: current.client_id,
            stale_key,
        })
    }

    /// Delete `old` through a client authenticated with the new credential.
    async fn retire(&self, old: &ServicePrincipalKey) -> Result<()> {
        let provider = self.client.resolve(&self.configs).await?;
        provider
            .delete_key(&old.resource_name)
            .await
            .map_err(|e| Error::provider_for(ProviderStep::DeleteKey, old.resource_name.as_str(), e))
    }
}
