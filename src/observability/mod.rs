//! # Observability
//!
//! Structured logging through `tracing`. Span macros (`request_span!`,
//! `engine_span!`) are exported at the crate root.

pub mod logging;

pub use logging::{init_logging, log_config_info};
