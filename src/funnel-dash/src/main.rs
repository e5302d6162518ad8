//! Funnel Dash, a passphrase-gated marketing funnel dashboard service.
//!
//! Main entry point: loads configuration, builds the data source and starts
//! the HTTP API.

use clap::{Parser, ValueEnum};
use funnel_api::ApiServer;
use funnel_core::config::{AppConfig, WarehouseBackend};
use tracing::{error, info};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Backend {
    Clickhouse,
    Json,
}

impl From<Backend> for WarehouseBackend {
    fn from(b: Backend) -> Self {
        match b {
            Backend::Clickhouse => WarehouseBackend::Clickhouse,
            Backend::Json => WarehouseBackend::Json,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "funnel-dash")]
#[command(about = "Marketing full-funnel dashboard")]
#[command(version)]
struct Cli {
    /// Optional configuration file (TOML, YAML or JSON)
    #[arg(long, short)]
    config: Option<String>,

    /// Bind address (overrides config)
    #[arg(long, env = "FUNNEL_DASH__API__HOST")]
    host: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "FUNNEL_DASH__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Data source backend (overrides config)
    #[arg(long, value_enum, env = "FUNNEL_DASH__WAREHOUSE__BACKEND", ignore_case = true)]
    backend: Option<Backend>,

    /// Fixture file for the json backend (overrides config)
    #[arg(long, env = "FUNNEL_DASH__WAREHOUSE__FIXTURE_PATH")]
    fixture_path: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "funnel_dash=info,funnel_api=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("Funnel Dash starting up");

    // Defaults only stand in when no --config was given.
    let mut config = AppConfig::resolve(cli.config.as_deref())?;

    // Apply CLI overrides
    if let Some(host) = cli.host {
        config.api.host = host;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(backend) = cli.backend {
        config.warehouse.backend = backend.into();
    }
    if let Some(path) = cli.fixture_path {
        config.warehouse.fixture_path = path;
    }

    config.validate()?;

    info!(
        http_port = config.api.http_port,
        backend = ?config.warehouse.backend,
        lookback_days = config.dashboard.lookback_days,
        session_ttl_secs = config.session.ttl_secs,
        "Configuration loaded"
    );

    let source = funnel_warehouse::from_config(&config.warehouse)?;

    let api_server = ApiServer::new(config, source);

    if let Err(e) = api_server.start_metrics().await {
        error!(error = %e, "Failed to start metrics exporter");
    }

    api_server.spawn_session_maintenance();

    info!("Funnel Dash is ready to serve traffic");

    // Start HTTP server (blocks until shutdown)
    api_server.start_http().await?;

    Ok(())
}
