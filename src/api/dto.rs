//! Request and response bodies of the HTTP surface.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::engine::{IssuedCredential, Lease, Role, RootConfig, RootConfigPatch, RotationReport};
use crate::errors::{Error, Result};
use crate::types::SecretString;

/// Body of `POST /v1/config`. Missing fields are reported by validation.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConfigWriteRequest {
    pub organization: String,
    pub project: String,
    pub client_id: String,
    pub client_secret: SecretString,
}

impl From<ConfigWriteRequest> for RootConfig {
    fn from(req: ConfigWriteRequest) -> Self {
        RootConfig::new(req.organization, req.project, req.client_id, req.client_secret)
    }
}

/// Body of `PATCH /v1/config`
pub type ConfigPatchRequest = RootConfigPatch;

/// A duration given either as integer seconds or as a humantime string such
/// as `"90s"`, `"5m"` or `"1h30m"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DurationInput {
    Seconds(u64),
    Text(String),
}

impl DurationInput {
    pub fn to_duration(&self, field: &str) -> Result<Duration> {
        match self {
            DurationInput::Seconds(secs) => Ok(Duration::from_secs(*secs)),
            DurationInput::Text(text) => parse_duration(text).map_err(|e| {
                Error::validation_field(
                    format!("{} '{}' is not a valid duration: {}", field, text, e),
                    field,
                )
            }),
        }
    }
}

/// Bare digits are seconds, anything else goes through humantime.
fn parse_duration(text: &str) -> std::result::Result<Duration, humantime::DurationError> {
    let text = text.trim();
    match text.parse::<u64>() {
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(_) => humantime::parse_duration(text),
    }
}

/// Body of `POST /v1/roles/{name}`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RoleWriteRequest {
    pub role: String,
    pub ttl: Option<DurationInput>,
    pub max_ttl: Option<DurationInput>,
}

impl RoleWriteRequest {
    pub fn ttls(&self) -> Result<(Option<Duration>, Option<Duration>)> {
        let ttl = self.ttl.as_ref().map(|t| t.to_duration("ttl")).transpose()?;
        let max_ttl = self.max_ttl.as_ref().map(|t| t.to_duration("max_ttl")).transpose()?;
        Ok((ttl, max_ttl))
    }
}

/// Role as read back by callers, durations in seconds
#[derive(Debug, Serialize, Deserialize)]
pub struct RoleResponse {
    pub name: String,
    pub role: String,
    pub ttl: u64,
    pub max_ttl: u64,
}

impl From<Role> for RoleResponse {
    fn from(role: Role) -> Self {
        Self {
            name: role.name,
            role: role.role.to_string(),
            ttl: role.ttl.as_secs(),
            max_ttl: role.max_ttl.as_secs(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse {
    pub keys: Vec<String>,
}

/// Response of `GET /v1/creds/{name}`
#[derive(Debug, Serialize)]
pub struct CredentialResponse {
    pub data: IssuedCredential,
    pub lease: Lease,
}

impl From<IssuedCredential> for CredentialResponse {
    fn from(issued: IssuedCredential) -> Self {
        let lease = issued.lease.clone();
        Self { data: issued, lease }
    }
}

/// Body of the lease renew and revoke calls
#[derive(Debug, Deserialize)]
pub struct LeaseRequest {
    pub lease: Lease,
}

#[derive(Debug, Serialize)]
pub struct LeaseResponse {
    pub lease: Lease,
}

/// Response of `POST /v1/config/rotate`
#[derive(Debug, Serialize)]
pub struct RotateResponse {
    #[serde(flatten)]
    pub report: RotationReport,
    pub warnings: Vec<String>,
}

impl From<RotationReport> for RotateResponse {
    fn from(report: RotationReport) -> Self {
        let warnings = report.warnings();
        Self { report, warnings }
    }
}
