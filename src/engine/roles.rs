//! Role definitions: a privilege level plus the lease bounds handed out for
//! credentials issued against the role. One record per `roles/<name>` key.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{Error, Result};
use crate::storage::{get_json, put_json, KeyValueStore};
use crate::types::duration_nanos;

pub const ROLES_PREFIX: &str = "roles/";

/// Project-level privilege granted to issued principals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivilegeLevel {
    Admin,
    Contributor,
    Viewer,
}

impl PrivilegeLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Contributor => "contributor",
            Self::Viewer => "viewer",
        }
    }

    /// Role identifier used in project IAM policy bindings
    pub fn iam_role_id(&self) -> &'static str {
        match self {
            Self::Admin => "roles/admin",
            Self::Contributor => "roles/contributor",
            Self::Viewer => "roles/viewer",
        }
    }
}

impl fmt::Display for PrivilegeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrivilegeLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" => Err(Error::validation_field("role is empty", "role")),
            "admin" => Ok(Self::Admin),
            "contributor" => Ok(Self::Contributor),
            "viewer" => Ok(Self::Viewer),
            _ => Err(Error::validation_field(
                "role is invalid. Valid values: `Admin`, `Contributor`, `Viewer`",
                "role",
            )),
        }
    }
}

/// A named issuance template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub role: PrivilegeLevel,
    #[serde(with = "duration_nanos", default, skip_serializing_if = "duration_nanos::is_zero")]
    pub ttl: Duration,
    #[serde(with = "duration_nanos", default, skip_serializing_if = "duration_nanos::is_zero")]
    pub max_ttl: Duration,
}

impl Role {
    pub fn new(name: impl Into<String>, role: PrivilegeLevel) -> Self {
        Self { name: name.into(), role, ttl: Duration::ZERO, max_ttl: Duration::ZERO }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_max_ttl(mut self, max_ttl: Duration) -> Self {
        self.max_ttl = max_ttl;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_role_name(&self.name)?;
        for (field, value) in [("ttl", self.ttl), ("max_ttl", self.max_ttl)] {
            if value.as_nanos() > i64::MAX as u128 {
                return Err(Error::validation_field(
                    format!("{} of {}s is out of range", field, value.as_secs()),
                    field,
                ));
            }
        }
        if !self.max_ttl.is_zero() && self.ttl > self.max_ttl {
            return Err(Error::validation_field("ttl cannot be greater than max_ttl", "ttl"));
        }
        Ok(())
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Names are single path segments of word characters, `-`, `.` or `@`,
/// starting and ending with a word character.
fn validate_role_name(name: &str) -> Result<()> {
    let (Some(first), Some(last)) = (name.chars().next(), name.chars().last()) else {
        return Err(Error::validation_field("name is empty", "name"));
    };
    if !is_word_char(first) || !is_word_char(last) {
        return Err(Error::validation_field(
            format!("name '{}' must start and end with a letter, digit or '_'", name),
            "name",
        ));
    }
    let valid = name.chars().all(|c| is_word_char(c) || matches!(c, '-' | '.' | '@'));
    if !valid {
        return Err(Error::validation_field(
            format!("name '{}' may only contain letters, digits, '_', '-', '.' and '@'", name),
            "name",
        ));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct RoleStore {
    store: Arc<dyn KeyValueStore>,
}

impl RoleStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn key(name: &str) -> String {
        format!("{}{}", ROLES_PREFIX, name)
    }

    /// Create or fully replace a role.
    pub async fn put(&self, role: &Role) -> Result<()> {
        role.validate()?;
        put_json(self.store.as_ref(), &Self::key(&role.name), role).await
    }

    pub async fn find(&self, name: &str) -> Result<Option<Role>> {
        get_json(self.store.as_ref(), &Self::key(name)).await
    }

    pub async fn get(&self, name: &str) -> Result<Role> {
        self.find(name).await?.ok_or_else(|| Error::role_not_found(name))
    }

    pub async fn delete(&self, name: &str) -> Result<()> {
        self.store.delete(&Self::key(name)).await
    }

    /// Role names in lexicographic order
    pub async fn list(&self) -> Result<Vec<String>> {
        self.store.list(ROLES_PREFIX).await
    }
}
