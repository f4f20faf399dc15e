//! # hcp-secrets
//!
//! Dynamic credentials for the HashiCorp Cloud Platform. The engine issues
//! short-lived service principals with a key pair on behalf of named roles,
//! and rotates its own root credential without ever leaving itself unable to
//! authenticate.
//!
//! ```text
//! HTTP API (axum) → SecretsBackend → CredentialIssuer / RootRotator
//!                        ↓                    ↓
//!              ConfigStore / RoleStore   ProviderClient → IdentityProvider (HCP IAM)
//!                        ↓
//!                  KeyValueStore (memory | SQLite)
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use hcp_secrets::{
//!     engine::{RootConfig, SecretsBackend},
//!     provider::{HttpProviderConfig, HttpProviderFactory},
//!     storage::MemoryStore,
//! };
//!
//! # async fn run() -> hcp_secrets::Result<()> {
//! let factory = HttpProviderFactory::new(HttpProviderConfig::default())?;
//! let backend = SecretsBackend::new(Arc::new(MemoryStore::new()), Arc::new(factory));
//!
//! backend.configure_root(RootConfig::new("org-id", "project-id", "client-id", "secret")).await?;
//! backend.put_role("ci", "Viewer", None, None).await?;
//! let issued = backend.issue_credential("ci").await?;
//! backend.revoke_lease(&issued.lease).await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod engine;
pub mod errors;
pub mod observability;
pub mod provider;
pub mod storage;
pub mod types;

pub use config::AppConfig;
pub use engine::SecretsBackend;
pub use errors::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
