//! provctl server: HTTP entry point for the audited-mutation gateway.

mod config;

use std::path::PathBuf;

use clap::Parser;
use provctl_db::DbError;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{ConfigError, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "provctl-server", version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, env = "PROVCTL_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overriding the configuration file
    #[arg(long, env = "PROVCTL_LISTEN")]
    listen: Option<String>,
}

#[derive(Debug, Error)]
enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Database(#[from] DbError),

    #[error("invalid log filter: {0}")]
    LogFilter(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

fn init_tracing(default_filter: &str) -> Result<(), ServerError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter)
            .map_err(|e| ServerError::LogFilter(e.to_string()))?,
    };
    tracing_subscriber::fmt().with_env_filter(filter).json().init();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}

async fn run(cli: Cli) -> Result<(), ServerError> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(listen) = cli.listen {
        config.listen = listen;
    }

    init_tracing(&config.log_filter)?;
    info!(listen = %config.listen, "Starting provctl server");

    let db = provctl_db::connect(&config.database).await?;
    let app = provctl_api::router(db, config.auth, config.store);

    let listener = TcpListener::bind(&config.listen).await?;
    info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("provctl server stopped");
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("provctl-server: {e}");
        std::process::exit(1);
    }
}
