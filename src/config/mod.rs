//! # Configuration Management
//!
//! Service settings loaded from environment variables (an optional `.env`
//! file is read first by the binary).
//!
//! | Variable | Default |
//! |---|---|
//! | `HCP_SECRETS_HOST` / `HCP_SECRETS_PORT` | `127.0.0.1` / `8200` |
//! | `HCP_SECRETS_STORAGE_URL` | `sqlite://./data/hcp-secrets.db` (`memory://` for in-memory) |
//! | `HCP_SECRETS_STORAGE_MAX_CONNECTIONS` | `5` |
//! | `HCP_API_ADDRESS` | `https://api.cloud.hashicorp.com` |
//! | `HCP_AUTH_URL` | `https://auth.idp.hashicorp.com/oauth2/token` |
//! | `HCP_AUTH_AUDIENCE` | `https://api.hashicorp.cloud` |
//! | `HCP_API_TIMEOUT_SECONDS` | `30` |
//! | `HCP_SECRETS_LOG_LEVEL` / `HCP_SECRETS_LOG_JSON` | `info` / `false` |

pub mod settings;

pub use settings::{
    AppConfig, HcpConfig, ObservabilityConfig, ServerConfig, StorageConfig, MEMORY_STORAGE_URL,
};
