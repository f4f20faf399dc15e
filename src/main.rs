use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use hcp_secrets::{
    api::start_api_server,
    config::AppConfig,
    observability::{init_logging, log_config_info},
    provider::HttpProviderFactory,
    storage::{KeyValueStore, MemoryStore, SqliteStore},
    SecretsBackend, APP_NAME, VERSION,
};

/// Dynamic HCP service principal credentials over HTTP
#[derive(Parser, Debug)]
#[command(name = "hcp-secrets", version, about)]
struct Cli {
    /// Bind host (overrides HCP_SECRETS_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides HCP_SECRETS_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// `memory://` or a `sqlite:` URL (overrides HCP_SECRETS_STORAGE_URL)
    #[arg(long, value_name = "URL")]
    storage_url: Option<String>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists; a missing file is not an error
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }

    let cli = Cli::parse();

    let mut config = AppConfig::from_env().context("Invalid configuration")?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(url) = cli.storage_url {
        config.storage.url = url;
    }
    if cli.verbose {
        config.observability.log_level = "debug".to_string();
    }
    config.validate().context("Invalid configuration")?;

    init_logging(&config.observability);
    info!(app_name = APP_NAME, version = VERSION, "Starting HCP secrets engine");
    log_config_info(&config);

    let store = open_store(&config).await?;
    let factory = HttpProviderFactory::new(config.hcp.provider())?;
    let backend = Arc::new(SecretsBackend::new(store, Arc::new(factory)));

    start_api_server(&config.server, backend).await?;
    Ok(())
}

async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    if config.storage.is_memory() {
        info!("Using in-memory storage; state is lost on exit");
        return Ok(Arc::new(MemoryStore::new()));
    }

    if let Some(path) = config.storage.url.strip_prefix("sqlite://") {
        if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let store = SqliteStore::connect(&config.storage.sqlite()).await?;
    Ok(Arc::new(store))
}
