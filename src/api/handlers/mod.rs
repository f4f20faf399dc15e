//! HTTP request handlers organized by resource type

pub mod config;
pub mod creds;
pub mod health;
pub mod roles;

pub use config::{
    delete_config_handler, patch_config_handler, read_config_handler, rotate_config_handler,
    write_config_handler,
};
pub use creds::{issue_credential_handler, renew_lease_handler, revoke_lease_handler};
pub use health::health_handler;
pub use roles::{delete_role_handler, get_role_handler, list_roles_handler, write_role_handler};
