use spotdeck_backend::api::{self, AppState};
use spotdeck_backend::config;
use spotdeck_backend::module::scheduled::ScheduledTaskManager;

use std::sync::Arc;

use anyhow::Result;
use spotdeck_common::{CallsignGeography, NoGeography, PrefixGeography};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let loaded = config::read_config(&config_path)?;
    let config_missing = loaded.is_none();
    let config = loaded.unwrap_or_default();

    // Initialize logging
    let _logging_guard = spotdeck_backend::logging::init_logging(
        &config.log_dir,
        "spotdeck-backend",
        &config.log_level,
    );

    tracing::info!("Spotdeck backend starting...");
    if config_missing {
        tracing::warn!("Config file {} not found, using defaults", config_path);
    }
    tracing::info!("Server will listen on {}", config.server_address());

    let geography: Arc<dyn CallsignGeography> = if config.geography.is_empty() {
        tracing::info!("No prefix table configured, geography filters will see unknown values");
        Arc::new(NoGeography)
    } else {
        let table = PrefixGeography::new(config.geography.clone());
        tracing::info!("Loaded {} callsign prefixes", table.len());
        Arc::new(table)
    };

    // Build pipelines and start polling
    let mut task_manager = ScheduledTaskManager::from_config(&config, geography)?;
    task_manager.start_all();

    let state = AppState {
        cluster: task_manager.cluster(),
        pskreporter: task_manager.pskreporter(),
    };

    let listener = tokio::net::TcpListener::bind(config.server_address()).await?;
    tracing::info!("HTTP server starting on {}", config.server_address());

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutdown signal received");
        })
        .await?;

    task_manager.shutdown().await;
    Ok(())
}
