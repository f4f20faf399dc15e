//! Wire types exchanged with the identity provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::SecretString;

/// Credential and scope used to authenticate to the provider.
///
/// All fields are empty when the engine has no root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderCredentials {
    pub organization_id: String,
    pub project_id: String,
    pub client_id: String,
    pub client_secret: SecretString,
}

impl ProviderCredentials {
    pub fn is_empty(&self) -> bool {
        self.client_id.is_empty() && self.client_secret.is_empty()
    }
}

/// A machine identity registered with the provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePrincipal {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub resource_name: String,
    #[serde(default)]
    pub organization_id: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Public half of a credential key bound to a principal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePrincipalKey {
    #[serde(default)]
    pub id: String,
    pub client_id: String,
    pub resource_name: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalDetails {
    #[serde(rename = "service_principal")]
    pub principal: ServicePrincipal,
    #[serde(default)]
    pub keys: Vec<ServicePrincipalKey>,
}

impl PrincipalDetails {
    /// The key whose public client id equals `client_id`, if any.
    pub fn key_for_client(&self, client_id: &str) -> Option<&ServicePrincipalKey> {
        self.keys.iter().find(|k| k.client_id == client_id)
    }
}

/// A freshly minted key together with its one-time secret
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedKey {
    pub key: ServicePrincipalKey,
    pub client_secret: SecretString,
}

/// Project IAM policy as read from and written back to the resource manager
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IamPolicy {
    #[serde(default)]
    pub etag: String,
    #[serde(default)]
    pub bindings: Vec<IamBinding>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IamBinding {
    pub role_id: String,
    #[serde(default)]
    pub members: Vec<IamBindingMember>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IamBindingMember {
    pub member_id: String,
    pub member_type: String,
}

impl IamBindingMember {
    pub const SERVICE_PRINCIPAL: &'static str = "SERVICE_PRINCIPAL";

    pub fn service_principal<S: Into<String>>(member_id: S) -> Self {
        Self { member_id: member_id.into(), member_type: Self::SERVICE_PRINCIPAL.to_string() }
    }
}
