mod config;

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};
use ttlgate_server::AppState;

use crate::config::LoadedConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).json().init();

    // Parse command-line args for config path
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/ttlgate.yaml".to_string());

    info!(config_path = %config_path, "starting ttlgate");

    let loaded = LoadedConfig::load(&config_path)?;
    let app_config = loaded.config;
    info!(
        path = %loaded.config_path.display(),
        rate_limit = app_config.rate_limit.enabled,
        "configuration loaded"
    );

    let state = Arc::new(AppState::from_config(&app_config)?);

    let served = ttlgate_server::run_server(
        Arc::clone(&state),
        &app_config.server.listen,
        app_config.server.cors,
        shutdown_signal(),
    )
    .await;

    state.shutdown().await;

    if let Err(e) = &served {
        error!(error = %e, "server error");
    }
    info!("ttlgate stopped");
    served
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => error!(error = %e, "failed to listen for shutdown signal"),
    }
}
