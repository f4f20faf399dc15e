//! Common test utilities for all integration tests.
//!
//! [`FakeCloud`] is an in-memory stand-in for the HCP IAM service. It records
//! every provider call with the client id that made it, can be told to fail a
//! given step, and enforces the two-keys-per-principal limit.

#![allow(dead_code)]
#![allow(clippy::duplicate_mod)]

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use hcp_secrets::{
    engine::{RootConfig, SecretsBackend},
    errors::{Error, Result},
    provider::{
        CreatedKey, IamPolicy, IdentityProvider, PrincipalDetails, ProviderCredentials,
        ProviderError, ProviderFactory, ProviderResult, ProviderStep, ServicePrincipal,
        ServicePrincipalKey,
    },
    storage::MemoryStore,
    types::SecretString,
};

pub const ORG_ID: &str = "o1";
pub const PROJECT_ID: &str = "p1";
pub const ROOT_PRINCIPAL: &str = "iam/project/p1/service-principal/vault-root";
pub const ROOT_CLIENT_ID: &str = "root-client";
pub const ROOT_SECRET: &str = "root-secret";

const MAX_KEYS_PER_PRINCIPAL: usize = 2;

/// One recorded provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub step: ProviderStep,
    pub resource: String,
    /// Client id of the credential the call was made with
    pub caller: String,
}

#[derive(Debug, Clone)]
struct StoredKey {
    principal: String,
    key: ServicePrincipalKey,
    secret: String,
}

#[derive(Debug, Default)]
struct CloudState {
    principals: BTreeMap<String, ServicePrincipal>,
    keys: BTreeMap<String, StoredKey>,
    policy: IamPolicy,
    calls: Vec<Call>,
    failing: HashSet<ProviderStep>,
    /// Client ids left out of key listings
    unlisted: HashSet<String>,
    /// Client ids deleted behind the engine's back
    revoked: HashSet<String>,
    next_id: u64,
}

impl CloudState {
    fn mint_key(&mut self, principal: &str) -> (ServicePrincipalKey, String) {
        self.next_id += 1;
        let client_id = format!("client-{}", self.next_id);
        let key = ServicePrincipalKey {
            id: format!("key-{}", self.next_id),
            client_id: client_id.clone(),
            resource_name: format!("{}/key/{}", principal, client_id),
            state: "ACTIVE".to_string(),
            created_at: Some(chrono::Utc::now()),
        };
        let secret = format!("secret-{}", self.next_id);
        self.keys.insert(
            key.resource_name.clone(),
            StoredKey { principal: principal.to_string(), key: key.clone(), secret: secret.clone() },
        );
        (key, secret)
    }

    fn keys_of(&self, principal: &str) -> Vec<ServicePrincipalKey> {
        self.keys.values().filter(|k| k.principal == principal).map(|k| k.key.clone()).collect()
    }
}

/// Shared fake provider state. Clones observe the same cloud.
#[derive(Debug, Clone, Default)]
pub struct FakeCloud {
    state: Arc<Mutex<CloudState>>,
}

impl FakeCloud {
    /// A cloud holding the root principal with a single key
    /// (`ROOT_CLIENT_ID` / `ROOT_SECRET`).
    pub fn new() -> Self {
        let cloud = Self::default();
        {
            let mut state = cloud.state.lock().unwrap();
            state.principals.insert(
                ROOT_PRINCIPAL.to_string(),
                ServicePrincipal {
                    id: "sp-root".into(),
                    name: "vault-root".into(),
                    resource_name: ROOT_PRINCIPAL.into(),
                    organization_id: ORG_ID.into(),
                    project_id: PROJECT_ID.into(),
                    created_at: None,
                },
            );
            let key = ServicePrincipalKey {
                id: "key-root".into(),
                client_id: ROOT_CLIENT_ID.into(),
                resource_name: format!("{}/key/{}", ROOT_PRINCIPAL, ROOT_CLIENT_ID),
                state: "ACTIVE".into(),
                created_at: None,
            };
            state.keys.insert(
                key.resource_name.clone(),
                StoredKey { principal: ROOT_PRINCIPAL.into(), key, secret: ROOT_SECRET.into() },
            );
        }
        cloud
    }

    pub fn root_config() -> RootConfig {
        RootConfig::new(ORG_ID, PROJECT_ID, ROOT_CLIENT_ID, ROOT_SECRET)
    }

    /// Make every later call of `step` fail with a 500.
    pub fn fail_on(&self, step: ProviderStep) {
        self.state.lock().unwrap().failing.insert(step);
    }

    /// Leave `client_id` out of principal key listings while it still
    /// authenticates.
    pub fn unlist_key(&self, client_id: &str) {
        self.state.lock().unwrap().unlisted.insert(client_id.to_string());
    }

    /// Delete the key of `client_id` out of band, so handles already
    /// authenticated with it get 401s from then on.
    pub fn revoke_key(&self, client_id: &str) {
        let mut state = self.state.lock().unwrap();
        state.keys.retain(|_, k| k.key.client_id != client_id);
        state.revoked.insert(client_id.to_string());
    }

    pub fn clear_failures(&self) {
        self.state.lock().unwrap().failing.clear();
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn steps(&self) -> Vec<ProviderStep> {
        self.calls().into_iter().map(|c| c.step).collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn principal_names(&self) -> Vec<String> {
        self.state.lock().unwrap().principals.keys().cloned().collect()
    }

    /// Client ids of all live keys of `principal`
    pub fn client_ids_of(&self, principal: &str) -> Vec<String> {
        self.state.lock().unwrap().keys_of(principal).into_iter().map(|k| k.client_id).collect()
    }

    pub fn key_exists(&self, resource_name: &str) -> bool {
        self.state.lock().unwrap().keys.contains_key(resource_name)
    }

    pub fn policy(&self) -> IamPolicy {
        self.state.lock().unwrap().policy.clone()
    }

    fn record(&self, step: ProviderStep, resource: &str, caller: &str) -> ProviderResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call { step, resource: resource.to_string(), caller: caller.to_string() });
        if state.revoked.contains(caller) {
            return Err(ProviderError::Unauthorized);
        }
        if state.failing.contains(&step) {
            return Err(ProviderError::status(500, format!("injected {} failure", step)));
        }
        Ok(())
    }

    fn authenticate(&self, credentials: &ProviderCredentials) -> bool {
        let state = self.state.lock().unwrap();
        state.keys.values().any(|k| {
            k.key.client_id == credentials.client_id
                && k.secret == credentials.client_secret.expose_secret()
        })
    }
}

/// Provider handle bound to the credential it was built from
pub struct FakeProvider {
    cloud: FakeCloud,
    client_id: String,
}

fn not_found(resource: &str) -> ProviderError {
    ProviderError::status(404, format!("{} not found", resource))
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    async fn whoami(&self) -> ProviderResult<ServicePrincipal> {
        self.cloud.record(ProviderStep::CallerIdentity, "caller-identity", &self.client_id)?;
        let state = self.cloud.state.lock().unwrap();
        let owner = state
            .keys
            .values()
            .find(|k| k.key.client_id == self.client_id)
            .map(|k| k.principal.clone())
            .ok_or(ProviderError::Unauthorized)?;
        state.principals.get(&owner).cloned().ok_or_else(|| not_found(&owner))
    }

    async fn create_principal(&self, parent: &str, name: &str) -> ProviderResult<ServicePrincipal> {
        let resource_name = format!("iam/{}/service-principal/{}", parent, name);
        self.cloud.record(ProviderStep::CreatePrincipal, &resource_name, &self.client_id)?;
        let mut state = self.cloud.state.lock().unwrap();
        state.next_id += 1;
        let principal = ServicePrincipal {
            id: format!("sp-{}", state.next_id),
            name: name.to_string(),
            resource_name: resource_name.clone(),
            organization_id: ORG_ID.into(),
            project_id: PROJECT_ID.into(),
            created_at: Some(chrono::Utc::now()),
        };
        state.principals.insert(resource_name, principal.clone());
        Ok(principal)
    }

    async fn delete_principal(&self, resource_name: &str) -> ProviderResult<()> {
        self.cloud.record(ProviderStep::DeletePrincipal, resource_name, &self.client_id)?;
        let mut state = self.cloud.state.lock().unwrap();
        state.principals.remove(resource_name).ok_or_else(|| not_found(resource_name))?;
        state.keys.retain(|_, k| k.principal != resource_name);
        Ok(())
    }

    async fn get_principal(&self, resource_name: &str) -> ProviderResult<PrincipalDetails> {
        self.cloud.record(ProviderStep::ListKeys, resource_name, &self.client_id)?;
        let state = self.cloud.state.lock().unwrap();
        let principal =
            state.principals.get(resource_name).cloned().ok_or_else(|| not_found(resource_name))?;
        let keys = state
            .keys_of(resource_name)
            .into_iter()
            .filter(|k| !state.unlisted.contains(&k.client_id))
            .collect();
        Ok(PrincipalDetails { principal, keys })
    }

    async fn create_key(&self, principal_resource_name: &str) -> ProviderResult<CreatedKey> {
        self.cloud.record(ProviderStep::CreateKey, principal_resource_name, &self.client_id)?;
        let mut state = self.cloud.state.lock().unwrap();
        if !state.principals.contains_key(principal_resource_name) {
            return Err(not_found(principal_resource_name));
        }
        if state.keys_of(principal_resource_name).len() >= MAX_KEYS_PER_PRINCIPAL {
            return Err(ProviderError::status(400, "service principal already has two keys"));
        }
        let (key, secret) = state.mint_key(principal_resource_name);
        Ok(CreatedKey { key, client_secret: SecretString::new(secret) })
    }

    async fn delete_key(&self, key_resource_name: &str) -> ProviderResult<()> {
        self.cloud.record(ProviderStep::DeleteKey, key_resource_name, &self.client_id)?;
        let mut state = self.cloud.state.lock().unwrap();
        state.keys.remove(key_resource_name).map(|_| ()).ok_or_else(|| not_found(key_resource_name))
    }

    async fn get_iam_policy(&self, project_id: &str) -> ProviderResult<IamPolicy> {
        self.cloud.record(ProviderStep::GetIamPolicy, project_id, &self.client_id)?;
        Ok(self.cloud.state.lock().unwrap().policy.clone())
    }

    async fn set_iam_policy(&self, project_id: &str, policy: &IamPolicy) -> ProviderResult<IamPolicy> {
        self.cloud.record(ProviderStep::SetIamPolicy, project_id, &self.client_id)?;
        let mut state = self.cloud.state.lock().unwrap();
        state.policy = IamPolicy { etag: format!("{}+", policy.etag), bindings: policy.bindings.clone() };
        Ok(state.policy.clone())
    }
}

/// Builds [`FakeProvider`]s, rejecting credentials that are not live keys.
#[derive(Debug, Default)]
pub struct FakeFactory {
    cloud: FakeCloud,
    connects: AtomicU64,
}

impl FakeFactory {
    pub fn new(cloud: FakeCloud) -> Self {
        Self { cloud, connects: AtomicU64::new(0) }
    }

    /// Number of successful connections
    pub fn connects(&self) -> u64 {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderFactory for FakeFactory {
    async fn connect(&self, credentials: &ProviderCredentials) -> Result<Arc<dyn IdentityProvider>> {
        if !self.cloud.authenticate(credentials) {
            return Err(Error::authentication(format!(
                "no valid credentials available for client_id '{}'",
                credentials.client_id
            )));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FakeProvider { cloud: self.cloud.clone(), client_id: credentials.client_id.clone() }))
    }
}

/// Engine wired to a fresh in-memory store and the given fake cloud.
pub struct TestEngine {
    pub backend: Arc<SecretsBackend>,
    pub store: MemoryStore,
    pub cloud: FakeCloud,
    pub factory: Arc<FakeFactory>,
}

impl TestEngine {
    pub fn new(cloud: FakeCloud) -> Self {
        let store = MemoryStore::new();
        let factory = Arc::new(FakeFactory::new(cloud.clone()));
        let backend = Arc::new(SecretsBackend::new(Arc::new(store.clone()), factory.clone()));
        Self { backend, store, cloud, factory }
    }

    /// Engine with the root credential already configured.
    pub async fn configured() -> Self {
        let engine = Self::new(FakeCloud::new());
        engine.backend.configure_root(FakeCloud::root_config()).await.expect("configure root");
        engine
    }
}
