//! Poolsync Server - Headless Daemon
//!
//! Hosts the pool sync engine behind the orchestrator's processor endpoint
//! and exposes a small REST API for registry watchers:
//! - `POST|DELETE /shared/iapp/processors/basicPoolConfig` sync / tear down a pool
//! - `/api/watchers` start, list and stop registry watchers
//!
//! Access via: http://localhost:8105

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use tracing::info;

mod api;
mod cli;
mod commands;
mod router;
mod server_utils;
mod state;
#[cfg(test)]
mod test_helpers;

use cli::{Cli, Commands};
use poolsync_core::modules::{config as core_config, logger};
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => core_config::default_config_path()?,
    };

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => {
            logger::init_logging(&cli.log_level)?;
            run_server(&config_path, port).await
        },
        Commands::CheckConfig { json } => commands::check_config(&config_path, json),
        Commands::InitConfig { force } => commands::init_config(&config_path, force),
    }
}

async fn run_server(config_path: &Path, port: Option<u16>) -> Result<()> {
    let mut config = core_config::load_config_from(config_path)?;
    if let Some(port) = port {
        config.server.port = port;
    }

    info!("🚀 Poolsync starting (config: {})", config_path.display());
    info!("📡 Gateway {} / registry {}", config.gateway.base_url, config.registry.base_url);

    let state = AppState::from_config(&config)?;
    let app = router::build_router(state.clone());
    let listener = server_utils::create_listener(&config.server).await?;

    info!("🔀 Processor endpoint at {}", state.processor_uri());
    info!("🔌 API available at http://{}/api/", config.server.socket_addr());

    axum::serve(listener, app).with_graceful_shutdown(server_utils::shutdown_signal()).await?;

    state.watchers().shutdown_all().await;
    info!("✅ Poolsync stopped");
    Ok(())
}
