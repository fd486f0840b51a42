use anyhow::Context;
use tracing::{info, warn};

use crate::app::{router, AppState};
use crate::config::AppConfig;
use crate::database::DatabaseManager;

pub async fn handle(mut config: AppConfig, port: Option<u16>) -> anyhow::Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }

    if config.is_production() && config.database.url.is_none() {
        warn!("Production mode without DATABASE_URL; documents live in memory only");
    }

    let store = DatabaseManager::connect(&config.database)
        .await
        .context("failed to open the document store")?;
    let state = AppState::new(config, store.clone());
    if state.geocoder.is_none() {
        info!("GEOCODER_API_KEY not set; bootcamps are stored without location");
    }

    let bind_addr = format!("0.0.0.0:{}", state.config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!(
        "DevCamper API listening on http://{} ({:?} mode, {} store)",
        bind_addr,
        state.config.environment,
        store.backend_name()
    );

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install CTRL+C signal handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received, starting graceful shutdown...");
    };

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    DatabaseManager::close(&store).await;
    info!("Server shutdown complete");
    Ok(())
}
