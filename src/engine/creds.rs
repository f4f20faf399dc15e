//! # Dynamic Credentials
//!
//! [`CredentialIssuer`] turns a role into a live service principal plus key
//! pair and hands it out as a [`Lease`]. Revocation tears the pair down in
//! the reverse order: key first, then the principal.
//!
//! The provider caps principals at two keys each and projects at five
//! principals, so a principal left behind by a failed key creation is
//! reported loudly with its resource name for out-of-band cleanup.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::config::ConfigStore;
use super::roles::{PrivilegeLevel, RoleStore};
use crate::errors::{Error, Result};
use crate::provider::{ProviderClient, ProviderStep};
use crate::types::{duration_secs, serialize_exposed, SecretString};

/// Longest principal name the provider accepts
pub const PRINCIPAL_NAME_MAX_LEN: usize = 36;

/// `v-<level>-<rand>-<unix>`, cut to [`PRINCIPAL_NAME_MAX_LEN`] keeping the prefix.
pub fn principal_name(level: PrivilegeLevel, random: u16, unix_seconds: i64) -> String {
    let mut name = format!("v-{}-{:03}-{}", level, random % 1000, unix_seconds);
    name.truncate(PRINCIPAL_NAME_MAX_LEN);
    name
}

/// Provider-side identifiers needed to renew and revoke a lease.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseInternal {
    /// Originating role name
    pub vault_role: String,
    /// Resource name of the issued key
    pub resource_name: String,
    /// Resource name of the issued principal
    pub service_principal: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Handle over an issued credential. Zero durations mean no explicit bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    pub lease_id: Uuid,
    #[serde(with = "duration_secs", default)]
    pub ttl: Duration,
    #[serde(with = "duration_secs", default)]
    pub max_ttl: Duration,
    #[serde(default = "renewable_default")]
    pub renewable: bool,
    pub internal: LeaseInternal,
}

fn renewable_default() -> bool {
    true
}

/// The one-time credential payload. The secret is never persisted by the engine.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedCredential {
    pub client_id: String,
    #[serde(serialize_with = "serialize_exposed")]
    pub client_secret: SecretString,
    #[serde(skip)]
    pub lease: Lease,
}

/// Stateless orchestrator over the stores and the provider client.
#[derive(Debug, Clone)]
pub struct CredentialIssuer {
    configs: ConfigStore,
    roles: RoleStore,
    client: Arc<ProviderClient>,
}

impl CredentialIssuer {
    pub fn new(configs: ConfigStore, roles: RoleStore, client: Arc<ProviderClient>) -> Self {
        Self { configs, roles, client }
    }

    /// Create a principal and key for `role_name`.
    ///
    /// An unknown role fails before any provider call is made.
    pub async fn issue(&self, role_name: &str) -> Result<IssuedCredential> {
        let role = self.roles.get(role_name).await?;
        let config = self.configs.require().await?;
        let provider = self.client.resolve(&self.configs).await?;

        let name = principal_name(
            role.role,
            rand::thread_rng().gen_range(0..1000),
            Utc::now().timestamp(),
        );
        let parent = format!("project/{}", config.project_id);

        let principal = provider.create_principal(&parent, &name).await.map_err(|e| {
            error!(role = %role_name, principal = %name, error = %e, "Failed to create service principal");
            Error::provider_for(ProviderStep::CreatePrincipal, name.as_str(), e)
        })?;

        let created = match provider.create_key(&principal.resource_name).await {
            Ok(created) => created,
            Err(e) => {
                error!(role = %role_name, error = %e, "Failed to create service principal key");
                warn!(
                    principal = %principal.resource_name,
                    role = %role_name,
                    "Service principal orphaned after key creation failed; delete it manually"
                );
                return Err(Error::provider_for(ProviderStep::CreateKey, principal.resource_name, e));
            }
        };

        let lease = Lease {
            lease_id: Uuid::new_v4(),
            ttl: role.ttl,
            max_ttl: role.max_ttl,
            renewable: true,
            internal: LeaseInternal {
                vault_role: role_name.to_string(),
                resource_name: created.key.resource_name.clone(),
                service_principal: principal.resource_name.clone(),
                created_at: created.key.created_at,
            },
        };

        info!(
            role = %role_name,
            principal = %principal.resource_name,
            client_id = %created.key.client_id,
            ttl_secs = lease.ttl.as_secs(),
            "Issued service principal credential"
        );

        Ok(IssuedCredential {
            client_id: created.key.client_id,
            client_secret: created.client_secret,
            lease,
        })
    }

    /// Re-apply the originating role's current bounds. No provider calls.
    pub async fn renew(&self, lease: &Lease) -> Result<Lease> {
        if lease.internal.vault_role.is_empty() {
            return Err(Error::validation_field("lease has no originating role", "vault_role"));
        }

        let role = self.roles.get(&lease.internal.vault_role).await?;
        let renewed = Lease { ttl: role.ttl, max_ttl: role.max_ttl, ..lease.clone() };

        info!(
            lease_id = %lease.lease_id,
            role = %role.name,
            ttl_secs = renewed.ttl.as_secs(),
            max_ttl_secs = renewed.max_ttl.as_secs(),
            "Renewed lease"
        );
        Ok(renewed)
    }

    /// Delete the key, then the principal. A failed key deletion stops here.
    pub async fn revoke(&self, lease: &Lease) -> Result<()> {
        let LeaseInternal { resource_name, service_principal, .. } = &lease.internal;
        if resource_name.is_empty() {
            return Err(Error::validation_field("lease has no key resource name", "resource_name"));
        }
        if service_principal.is_empty() {
            return Err(Error::validation_field(
                "lease has no service principal resource name",
                "service_principal",
            ));
        }

        let provider = self.client.resolve(&self.configs).await?;

        provider.delete_key(resource_name).await.map_err(|e| {
            error!(key = %resource_name, error = %e, "Failed to delete service principal key");
            Error::provider_for(ProviderStep::DeleteKey, resource_name.as_str(), e)
        })?;

        provider.delete_principal(service_principal).await.map_err(|e| {
            error!(principal = %service_principal, error = %e, "Failed to delete service principal");
            Error::provider_for(ProviderStep::DeletePrincipal, service_principal.as_str(), e)
        })?;

        info!(lease_id = %lease.lease_id, principal = %service_principal, "Revoked lease");
        Ok(())
    }
}
