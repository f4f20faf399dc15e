//! Cached provider handle.
//!
//! One authenticated [`IdentityProvider`] handle is kept per engine instance.
//! It is built lazily from the stored root configuration and dropped whenever
//! that configuration changes.
//!
//! # Concurrency
//!
//! Readers share the cached handle through a `tokio::sync::RwLock`. Building
//! happens while holding the write lock, so a concurrent `invalidate` waits for
//! the build to finish and then drops a complete handle; no caller can ever
//! observe a half-built one. Tokio's lock is fair, so a pending invalidation is
//! not starved by a stream of readers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{IdentityProvider, ProviderCredentials, ProviderFactory};
use crate::engine::config::ConfigStore;
use crate::errors::{Error, Result};

pub struct ProviderClient {
    factory: Arc<dyn ProviderFactory>,
    cached: RwLock<Option<Arc<dyn IdentityProvider>>>,
    builds: AtomicU64,
}

impl ProviderClient {
    pub fn new(factory: Arc<dyn ProviderFactory>) -> Self {
        Self { factory, cached: RwLock::new(None), builds: AtomicU64::new(0) }
    }

    /// Return the cached handle, building it from the stored root config if
    /// there is none.
    ///
    /// Without a root config the handle is built from an empty credential and
    /// the factory's liveness check reports the failure.
    pub async fn resolve(&self, configs: &ConfigStore) -> Result<Arc<dyn IdentityProvider>> {
        if let Some(handle) = self.cached.read().await.as_ref() {
            debug!("Provider client cache hit");
            return Ok(Arc::clone(handle));
        }

        let mut slot = self.cached.write().await;
        // another caller may have built it while we waited for the write lock
        if let Some(handle) = slot.as_ref() {
            return Ok(Arc::clone(handle));
        }

        let credentials = match configs.get().await? {
            Some(config) => config.credentials(),
            None => {
                debug!("No root configuration stored, connecting with an empty credential");
                ProviderCredentials::default()
            }
        };

        let handle = self.factory.connect(&credentials).await?;
        let build = self.builds.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(build, client_id = %credentials.client_id, "Built provider client");

        *slot = Some(Arc::clone(&handle));
        Ok(handle)
    }

    /// Drop the cached handle; the next `resolve` rebuilds it.
    pub async fn invalidate(&self) {
        let mut slot = self.cached.write().await;
        if slot.take().is_some() {
            debug!("Invalidated provider client");
        }
    }

    /// Drop the cached handle when `result` shows the provider rejected its
    /// credential, so the next call rebuilds from the stored configuration.
    pub async fn forget_if_rejected<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(Error::Authentication { message }) = &result {
            if self.cached.write().await.take().is_some() {
                warn!(reason = %message, "Provider rejected the cached credential; dropping client");
            }
        }
        result
    }

    /// Number of handles built so far
    pub fn build_count(&self) -> u64 {
        self.builds.load(Ordering::SeqCst)
    }

    pub async fn is_cached(&self) -> bool {
        self.cached.read().await.is_some()
    }
}

impl std::fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClient").field("builds", &self.build_count()).finish_non_exhaustive()
    }
}
