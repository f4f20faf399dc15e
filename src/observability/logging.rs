//! # Structured Logging
//!
//! Subscriber setup plus span macros for the HTTP layer and for engine
//! operations. Client secrets are never recorded as span or event fields.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{AppConfig, ObservabilityConfig};

/// Create a tracing span for an incoming HTTP request.
///
/// ```rust,ignore
/// let span = request_span!("GET", "/v1/creds/deployer");
/// ```
#[macro_export]
macro_rules! request_span {
    ($method:expr, $path:expr) => {
        tracing::info_span!(
            "http_request",
            method = %$method,
            path = %$path,
            request_id = %uuid::Uuid::new_v4()
        )
    };
    ($method:expr, $path:expr, $($field:tt)*) => {
        tracing::info_span!(
            "http_request",
            method = %$method,
            path = %$path,
            request_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Create a tracing span for an engine operation (issuance, rotation, ...).
///
/// ```rust,ignore
/// let span = engine_span!("issue_credential", role = %name);
/// ```
#[macro_export]
macro_rules! engine_span {
    ($operation:expr) => {
        tracing::info_span!(
            "engine_operation",
            operation = %$operation,
            operation_id = %uuid::Uuid::new_v4()
        )
    };
    ($operation:expr, $($field:tt)*) => {
        tracing::info_span!(
            "engine_operation",
            operation = %$operation,
            operation_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
///
/// Returns false if a subscriber was already installed (tests, embedding).
pub fn init_logging(config: &ObservabilityConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json_logging {
        registry.with(fmt::layer().json().with_current_span(true).with_target(true)).try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };
    result.is_ok()
}

/// Log configuration at startup
pub fn log_config_info(config: &AppConfig) {
    tracing::info!(
        server_address = %config.server.bind_address(),
        storage = if config.storage.is_memory() { "memory" } else { "sqlite" },
        hcp_api = %config.hcp.api_address,
        hcp_timeout_secs = config.hcp.timeout_seconds,
        json_logging = config.observability.json_logging,
        "HCP secrets engine configuration"
    );
}
