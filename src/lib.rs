//! QuoteWatch Desktop - stock watch list core
//!
//! Polls live quotes for followed A-share, Hong Kong and US stocks,
//! derives position metrics, fires price alerts and desktop notifications,
//! and serves everything to the webview shell over a local API.

pub mod api;
pub mod db;
pub mod error;
pub mod events;
pub mod notify;
pub mod quotes;
pub mod scheduler;
pub mod services;
pub mod state;

use api::ApiServer;
use scheduler::{AlertEvaluator, PriceMonitor};
use state::AppState;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "quotewatch_desktop=debug,quotewatch_desktop_lib=debug,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Run the background core until Ctrl-C
pub async fn run() -> error::Result<()> {
    init_tracing();
    tracing::info!("Starting QuoteWatch Desktop...");

    let app_state = Arc::new(AppState::new(state::resolve_data_dir())?);
    let api_config = app_state.sqlite.get_api_config()?;
    tracing::info!("Application state initialized");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let monitor = PriceMonitor::new(app_state.clone()).start(shutdown_rx.clone());
    let evaluator = AlertEvaluator::new(app_state.clone()).start(shutdown_rx);
    tracing::info!("Price monitor and alert evaluator started");

    let mut server = ApiServer::new(app_state.clone());
    if let Err(e) = server.start(api_config).await {
        tracing::error!("Failed to start API server: {}", e);
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");

    server.stop();
    let _ = shutdown_tx.send(true);
    for handle in [monitor, evaluator] {
        if let Err(e) = handle.await {
            tracing::error!("Background task ended abnormally: {}", e);
        }
    }

    if !app_state.writes.flush().await {
        tracing::warn!("Write queue closed before pending writes were flushed");
    }

    tracing::info!("QuoteWatch Desktop stopped");
    Ok(())
}
