//! # Identity Provider
//!
//! Boundary to the remote cloud identity provider. The engine never talks to
//! HTTP directly: it goes through the [`IdentityProvider`] trait, obtained from
//! a [`ProviderFactory`] and cached by [`ProviderClient`].
//!
//! - [`http`] is the production implementation against the HCP IAM REST API.
//! - [`client`] holds the process-wide cached handle and its invalidation.

pub mod client;
pub mod http;
pub mod types;

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

pub use client::ProviderClient;
pub use http::{HcpIdentityProvider, HttpProviderConfig, HttpProviderFactory};
pub use types::{
    CreatedKey, IamBinding, IamBindingMember, IamPolicy, PrincipalDetails, ProviderCredentials,
    ServicePrincipal, ServicePrincipalKey,
};

/// Result of a single provider round-trip
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Failure of one identity provider call.
///
/// The engine wraps this in [`crate::errors::Error::Provider`] together with
/// the [`ProviderStep`] that failed.
#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("credential rejected by the identity provider")]
    Unauthorized,

    #[error("failed to decode provider response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Create an unexpected status error
    pub fn status<S: Into<String>>(status: u16, body: S) -> Self {
        Self::Status { status, body: body.into() }
    }

    /// Create a decode error
    pub fn decode<S: Into<String>>(message: S) -> Self {
        Self::Decode(message.into())
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// The provider call an error belongs to, reported to operators so partial
/// provider-side state can be diagnosed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderStep {
    CallerIdentity,
    CreatePrincipal,
    CreateKey,
    DeleteKey,
    DeletePrincipal,
    ListKeys,
    GetIamPolicy,
    SetIamPolicy,
}

impl ProviderStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CallerIdentity => "caller-identity",
            Self::CreatePrincipal => "create-principal",
            Self::CreateKey => "create-key",
            Self::DeleteKey => "delete-key",
            Self::DeletePrincipal => "delete-principal",
            Self::ListKeys => "list-keys",
            Self::GetIamPolicy => "get-iam-policy",
            Self::SetIamPolicy => "set-iam-policy",
        }
    }
}

impl fmt::Display for ProviderStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations the engine needs from the identity provider.
///
/// Resource names are the provider's own fully qualified identifiers
/// (for example `iam/project/<id>/service-principal/<name>`).
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The service principal the current credential authenticates as.
    async fn whoami(&self) -> ProviderResult<ServicePrincipal>;

    async fn create_principal(&self, parent: &str, name: &str) -> ProviderResult<ServicePrincipal>;

    async fn delete_principal(&self, resource_name: &str) -> ProviderResult<()>;

    /// Principal metadata together with all of its keys.
    async fn get_principal(&self, resource_name: &str) -> ProviderResult<PrincipalDetails>;

    /// Mint a key pair under the principal. The secret is only ever returned here.
    async fn create_key(&self, principal_resource_name: &str) -> ProviderResult<CreatedKey>;

    async fn delete_key(&self, key_resource_name: &str) -> ProviderResult<()>;

    async fn get_iam_policy(&self, project_id: &str) -> ProviderResult<IamPolicy>;

    async fn set_iam_policy(&self, project_id: &str, policy: &IamPolicy) -> ProviderResult<IamPolicy>;
}

/// Builds authenticated [`IdentityProvider`] handles.
///
/// `connect` performs the liveness check; an unusable credential is reported
/// as [`crate::errors::Error::Authentication`].
#[async_trait]
pub trait ProviderFactory: Send + Sync {
    async fn connect(
        &self,
        credentials: &ProviderCredentials,
    ) -> crate::errors::Result<Arc<dyn IdentityProvider>>;
}
