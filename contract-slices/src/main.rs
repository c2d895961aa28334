//! contract-slices - Main entry point
//!
//! HTTP service recording contract time slices.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use contract_common::config::{
    load_toml_config, ConfigOverrides, LogFormat, LoggingConfig, ServiceConfig, TomlConfig,
};
use contract_common::db::init_database;
use contract_slices::{build_router, AppState};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Bound on connecting to and preparing the database at startup
const STARTUP_DB_TIMEOUT: Duration = Duration::from_secs(10);

/// Command-line arguments for contract-slices
#[derive(Parser, Debug)]
#[command(name = "contract-slices")]
#[command(about = "Contract time slice service")]
#[command(version)]
struct Args {
    /// SQLite database URL, e.g. sqlite://contracts.db
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Shared secret for HS256 bearer tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// Address to bind
    #[arg(long, env = "HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Optional TOML config file
    #[arg(short, long, env = "CONTRACT_SLICES_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let file = match &args.config {
        Some(path) => load_toml_config(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?,
        None => TomlConfig::default(),
    };

    init_tracing(&file.logging);

    info!(
        "Starting contract-slices v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let overrides = ConfigOverrides {
        database_url: args.database_url,
        jwt_secret: args.jwt_secret,
        host: args.host,
        port: args.port,
    };
    let config = match ServiceConfig::resolve(overrides, file) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e).context("Invalid configuration");
        }
    };

    let pool = tokio::time::timeout(
        STARTUP_DB_TIMEOUT,
        init_database(&config.database_url, &config.database),
    )
    .await
    .context("Timed out connecting to database")?
    .context("Failed to connect to database")?;
    info!("Database connection established");

    let state = AppState::new(pool.clone(), &config.jwt_secret)
        .with_timeouts(config.request_timeout, config.readiness_timeout);
    let app = build_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind to {}", address))?;
    info!(address = %address, "Server starting");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    pool.close().await;
    info!("Server stopped");
    Ok(())
}

/// RUST_LOG wins over the configured level
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let registry = tracing_subscriber::registry().with(filter);

    match logging.format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down gracefully");
        },
    }
}
