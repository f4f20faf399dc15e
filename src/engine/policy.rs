//! Project IAM policy binding for issued principals.
//!
//! Not part of the issuance path: callers that want an issued principal to
//! hold a project role invoke [`PolicyBinder::assign_role`] explicitly.

use std::sync::Arc;
use tracing::{error, info};

use super::config::ConfigStore;
use super::roles::PrivilegeLevel;
use crate::errors::{Error, Result};
use crate::provider::{IamBinding, IamBindingMember, IamPolicy, ProviderClient, ProviderStep};

/// Add `member` to the binding for `role_id`, creating the binding if the
/// policy has none. Returns false when the member was already bound.
pub fn bind_member(policy: &mut IamPolicy, role_id: &str, member: IamBindingMember) -> bool {
    match policy.bindings.iter_mut().find(|b| b.role_id == role_id) {
        Some(binding) => {
            if binding.members.contains(&member) {
                return false;
            }
            binding.members.push(member);
        }
        None => policy.bindings.push(IamBinding { role_id: role_id.to_string(), members: vec![member] }),
    }
    true
}

#[derive(Debug, Clone)]
pub struct PolicyBinder {
    configs: ConfigStore,
    client: Arc<ProviderClient>,
}

impl PolicyBinder {
    pub fn new(configs: ConfigStore, client: Arc<ProviderClient>) -> Self {
        Self { configs, client }
    }

    /// Grant `level` on the configured project to the principal with id
    /// `principal_id`. Read-modify-write; the provider checks the etag.
    pub async fn assign_role(&self, principal_id: &str, level: PrivilegeLevel) -> Result<IamPolicy> {
        let result = self.bind(principal_id, level).await;
        self.client.forget_if_rejected(result).await
    }

    async fn bind(&self, principal_id: &str, level: PrivilegeLevel) -> Result<IamPolicy> {
        let config = self.configs.require().await?;
        let provider = self.client.resolve(&self.configs).await?;

        let mut policy = provider.get_iam_policy(&config.project_id).await.map_err(|e| {
            error!(project = %config.project_id, error = %e, "Failed to read project IAM policy");
            Error::provider_for(ProviderStep::GetIamPolicy, config.project_id.as_str(), e)
        })?;

        if !bind_member(&mut policy, level.iam_role_id(), IamBindingMember::service_principal(principal_id)) {
            return Ok(policy);
        }

        let updated = provider.set_iam_policy(&config.project_id, &policy).await.map_err(|e| {
            error!(project = %config.project_id, error = %e, "Failed to write project IAM policy");
            Error::provider_for(ProviderStep::SetIamPolicy, config.project_id.as_str(), e)
        })?;

        info!(
            project = %config.project_id,
            principal_id = %principal_id,
            role = %level.iam_role_id(),
            "Bound service principal to project role"
        );
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_member_creates_binding() {
        let mut policy = IamPolicy::default();
        assert!(bind_member(&mut policy, "roles/viewer", IamBindingMember::service_principal("sp-1")));
        assert_eq!(policy.bindings.len(), 1);
        assert_eq!(policy.bindings[0].role_id, "roles/viewer");
        assert_eq!(policy.bindings[0].members[0].member_type, "SERVICE_PRINCIPAL");
    }

    #[test]
    fn test_bind_member_appends_to_existing_binding() {
        let mut policy = IamPolicy {
            etag: "e1".into(),
            bindings: vec![IamBinding {
                role_id: "roles/admin".into(),
                members: vec![IamBindingMember { member_id: "user-1".into(), member_type: "USER".into() }],
            }],
        };

        assert!(bind_member(&mut policy, "roles/admin", IamBindingMember::service_principal("sp-1")));
        assert_eq!(policy.bindings.len(), 1);
        assert_eq!(policy.bindings[0].members.len(), 2);
        assert_eq!(policy.etag, "e1");
    }

    #[test]
    fn test_bind_member_is_idempotent() {
        let mut policy = IamPolicy::default();
        bind_member(&mut policy, "roles/admin", IamBindingMember::service_principal("sp-1"));
        assert!(!bind_member(&mut policy, "roles/admin", IamBindingMember::service_principal("sp-1")));
        assert_eq!(policy.bindings[0].members.len(), 1);
    }
}
