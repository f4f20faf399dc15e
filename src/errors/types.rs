//! # Error Types
//!
//! Error taxonomy for the secrets engine using `thiserror`.

use crate::provider::{ProviderError, ProviderStep};

/// Custom result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the secrets engine.
///
/// Every failure surfaced to a caller is one of these variants; nothing in the
/// engine aborts the process.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Bad caller input: empty required field, ttl above max_ttl, unknown privilege level
    #[error("Validation error: {message}")]
    Validation { message: String, field: Option<String> },

    /// The operation needs a root configuration and none is stored
    #[error("Root configuration is missing; configure the engine first")]
    ConfigurationMissing,

    /// Named role does not exist
    #[error("Role not found: {name}")]
    RoleNotFound { name: String },

    /// The key/value store failed
    #[error("Storage error: {context}")]
    Storage {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A stored record could not be encoded or decoded
    #[error("Serialization error: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The root credential was rejected by the identity provider
    #[error("Authentication error: {message}")]
    Authentication { message: String },

    /// An identity provider call failed
    #[error("Provider error during {step}{}: {source}", resource_suffix(.resource))]
    Provider {
        step: ProviderStep,
        resource: Option<String>,
        #[source]
        source: ProviderError,
    },

    /// Rotation could not find the key backing the configured credential
    #[error("Unable to find the current service principal key for client_id '{client_id}'")]
    IdentityResolution { client_id: String },

    /// Service settings errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network transport errors for the HTTP surface
    #[error("Transport error: {0}")]
    Transport(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn resource_suffix(resource: &Option<String>) -> String {
    resource.as_ref().map(|r| format!(" ({})", r)).unwrap_or_default()
}

impl Error {
    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    /// Create a validation error with field information
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation { message: message.into(), field: Some(field.into()) }
    }

    /// Create a role not found error
    pub fn role_not_found<S: Into<String>>(name: S) -> Self {
        Self::RoleNotFound { name: name.into() }
    }

    /// Create a storage error without an underlying source
    pub fn storage<S: Into<String>>(context: S) -> Self {
        Self::Storage { context: context.into(), source: None }
    }

    /// Create a storage error wrapping the backend failure
    pub fn storage_with_source<S, E>(context: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage { context: context.into(), source: Some(Box::new(source)) }
    }

    /// Create a serialization error
    pub fn serialization<S: Into<String>>(context: S, source: serde_json::Error) -> Self {
        Self::Serialization { context: context.into(), source }
    }

    /// Create an authentication error
    pub fn authentication<S: Into<String>>(message: S) -> Self {
        Self::Authentication { message: message.into() }
    }

    /// Create a provider error for the given step.
    ///
    /// A rejected credential is reported as [`Error::Authentication`] whatever
    /// the step.
    pub fn provider(step: ProviderStep, source: ProviderError) -> Self {
        Self::provider_at(step, None, source)
    }

    /// Create a provider error naming the provider-side resource involved
    pub fn provider_for<S: Into<String>>(step: ProviderStep, resource: S, source: ProviderError) -> Self {
        Self::provider_at(step, Some(resource.into()), source)
    }

    fn provider_at(step: ProviderStep, resource: Option<String>, source: ProviderError) -> Self {
        match source {
            ProviderError::Unauthorized => Self::Authentication {
                message: format!("root credential rejected during {}{}", step, resource_suffix(&resource)),
            },
            source => Self::Provider { step, resource, source },
        }
    }

    /// Create a service configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport(message.into())
    }

    /// Whether the external caller may safely retry the same request.
    ///
    /// Only storage failures are considered transient. Provider failures are
    /// not retried by the engine and callers should inspect the step first.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }

    /// Stable, machine readable kind for API responses and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_failure",
            Self::ConfigurationMissing => "configuration_missing",
            Self::RoleNotFound { .. } => "role_not_found",
            Self::Storage { .. } => "storage_failure",
            Self::Serialization { .. } => "storage_failure",
            Self::Authentication { .. } => "authentication_failure",
            Self::Provider { .. } => "provider_failure",
            Self::IdentityResolution { .. } => "identity_resolution_failure",
            Self::Config(_) => "configuration_error",
            Self::Transport(_) => "transport_error",
            Self::Io(_) => "io_error",
        }
    }
}
