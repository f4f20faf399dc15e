//! # HTTP API
//!
//! axum surface over [`crate::engine::SecretsBackend`]:
//!
//! | Verb + path | Operation |
//! |---|---|
//! | `POST/PATCH/GET/DELETE /v1/config` | configure, patch, read, delete root config |
//! | `POST /v1/config/rotate` | rotate the root credential |
//! | `GET /v1/roles` | list roles |
//! | `POST/GET/DELETE /v1/roles/{name}` | write, read, delete a role |
//! | `GET /v1/creds/{name}` | issue a credential |
//! | `POST /v1/leases/renew`, `POST /v1/leases/revoke` | lease lifecycle |
//! | `GET /health` | liveness |

pub mod dto;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use routes::{build_router, ApiState};
pub use server::start_api_server;
