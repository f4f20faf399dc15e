//! # Secrets Engine
//!
//! [`SecretsBackend`] is the single entry point the request layer talks to.
//! It owns the stores, the cached provider client, and the stateless
//! orchestrators built on top of them:
//!
//! - [`config::ConfigStore`] / [`roles::RoleStore`]: persisted state
//! - [`creds::CredentialIssuer`]: issue, renew and revoke leases
//! - [`rotate::RootRotator`]: self-rotation of the root credential
//! - [`policy::PolicyBinder`]: optional project role binding
//!
//! Every mutation of the root configuration made through the backend drops
//! the cached provider client before returning.

pub mod config;
pub mod creds;
pub mod policy;
pub mod roles;
pub mod rotate;

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Instrument};

use crate::engine_span;
use crate::errors::Result;
use crate::provider::{ProviderClient, ProviderFactory};
use crate::storage::KeyValueStore;

pub use config::{ConfigStore, RootConfig, RootConfigPatch, RootConfigView, CONFIG_KEY};
pub use creds::{CredentialIssuer, IssuedCredential, Lease, LeaseInternal};
pub use policy::PolicyBinder;
pub use roles::{PrivilegeLevel, Role, RoleStore};
pub use rotate::{RootRotator, RotationReport, StaleKey};

/// Caller-facing operations of the engine
#[derive(Debug, Clone)]
pub struct SecretsBackend {
    configs: ConfigStore,
    roles: RoleStore,
    client: Arc<ProviderClient>,
    issuer: CredentialIssuer,
    rotator: RootRotator,
    policies: PolicyBinder,
}

impl SecretsBackend {
    pub fn new(store: Arc<dyn KeyValueStore>, factory: Arc<dyn ProviderFactory>) -> Self {
        let configs = ConfigStore::new(Arc::clone(&store));
        let roles = RoleStore::new(store);
        let client = Arc::new(ProviderClient::new(factory));

        Self {
            issuer: CredentialIssuer::new(configs.clone(), roles.clone(), Arc::clone(&client)),
            rotator: RootRotator::new(configs.clone(), Arc::clone(&client)),
            policies: PolicyBinder::new(configs.clone(), Arc::clone(&client)),
            configs,
            roles,
            client,
        }
    }

    pub fn provider_client(&self) -> &Arc<ProviderClient> {
        &self.client
    }

    pub fn policy_binder(&self) -> &PolicyBinder {
        &self.policies
    }

    /// Storage invalidation hook for changes made outside this process.
    pub async fn invalidate(&self, key: &str) {
        if key == CONFIG_KEY {
            self.client.invalidate().await;
        }
    }

    // ---- root configuration -------------------------------------------------

    /// Replace the root configuration. Organization and project ids are
    /// stored lower-case.
    pub async fn configure_root(&self, mut config: RootConfig) -> Result<()> {
        config.organization_id = config.organization_id.to_lowercase();
        config.project_id = config.project_id.to_lowercase();

        let result = self.configs.save(&config).await;
        self.client.invalidate().await;
        result?;

        info!(
            organization = %config.organization_id,
            project = %config.project_id,
            client_id = %config.client_id,
            "Root configuration written"
        );
        Ok(())
    }

    pub async fn patch_root(&self, mut patch: RootConfigPatch) -> Result<RootConfigView> {
        patch.organization = patch.organization.map(|o| o.to_lowercase());
        patch.project = patch.project.map(|p| p.to_lowercase());

        let result = self.configs.patch(patch).await;
        self.client.invalidate().await;
        let config = result?;

        info!(client_id = %config.client_id, "Root configuration patched");
        Ok(config.view())
    }

    /// Secret withheld; all fields empty when unconfigured.
    pub async fn read_root(&self) -> Result<RootConfigView> {
        Ok(self.configs.get().await?.map(|c| c.view()).unwrap_or_default())
    }

    pub async fn delete_root(&self) -> Result<()> {
        let result = self.configs.delete().await;
        self.client.invalidate().await;
        result?;

        info!("Root configuration deleted");
        Ok(())
    }

    pub async fn rotate_root(&self) -> Result<RotationReport> {
        let result = self.rotator.rotate().instrument(engine_span!("rotate_root")).await;
        self.client.forget_if_rejected(result).await
    }

    // ---- roles --------------------------------------------------------------

    /// Create or replace a role. `level` is parsed case-insensitively.
    pub async fn put_role(
        &self,
        name: &str,
        level: &str,
        ttl: Option<Duration>,
        max_ttl: Option<Duration>,
    ) -> Result<Role> {
        let role = Role::new(name, level.parse()?)
            .with_ttl(ttl.unwrap_or_default())
            .with_max_ttl(max_ttl.unwrap_or_default());
        self.roles.put(&role).await?;

        info!(
            role = %role.name,
            level = %role.role,
            ttl_secs = role.ttl.as_secs(),
            max_ttl_secs = role.max_ttl.as_secs(),
            "Role written"
        );
        Ok(role)
    }

    pub async fn get_role(&self, name: &str) -> Result<Role> {
        self.roles.get(name).await
    }

    pub async fn delete_role(&self, name: &str) -> Result<()> {
        self.roles.delete(name).await?;
        info!(role = %name, "Role deleted");
        Ok(())
    }

    pub async fn list_roles(&self) -> Result<Vec<String>> {
        self.roles.list().await
    }

    // ---- leases -------------------------------------------------------------

    pub async fn issue_credential(&self, role_name: &str) -> Result<IssuedCredential> {
        let result =
            self.issuer.issue(role_name).instrument(engine_span!("issue_credential", role = %role_name)).await;
        self.client.forget_if_rejected(result).await
    }

    pub async fn renew_lease(&self, lease: &Lease) -> Result<Lease> {
        self.issuer.renew(lease).instrument(engine_span!("renew_lease", lease_id = %lease.lease_id)).await
    }

    pub async fn revoke_lease(&self, lease: &Lease) -> Result<()> {
        let result =
            self.issuer.revoke(lease).instrument(engine_span!("revoke_lease", lease_id = %lease.lease_id)).await;
        self.client.forget_if_rejected(result).await
    }
}
