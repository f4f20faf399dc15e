//! # Error Handling
//!
//! Typed failures returned by every engine operation. See [`Error`] for the
//! taxonomy; [`Error::kind`] gives the stable name used in API responses.

pub mod types;

pub use types::{Error, Result};
