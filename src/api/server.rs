//! HTTP server for the local API
//!
//! Binds to loopback by default. The webview shell uses it to call the
//! watch-list actions and to follow live events over SSE.

use crate::api::handlers::{self, SharedState};
use crate::db::sqlite::ApiConfig;
use crate::error::{AppError, Result};
use axum::{
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Build the router with every route
pub fn router(state: SharedState) -> Router {
    // Build CORS layer (the shell loads from a custom origin)
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ================================================================
        // Health check
        // ================================================================
        .route("/health", get(handlers::health_check))
        .route("/", get(handlers::health_check))

        // ================================================================
        // Live stock views
        // ================================================================
        .route(
            "/api/stocks",
            get(handlers::get_stock_infos).post(handlers::post_stock_infos),
        )
        .route("/api/stocks/search", get(handlers::search_stocks))
        .route("/api/stocks/directory", post(handlers::import_stock_directory))

        // ================================================================
        // Watch list
        // ================================================================
        .route("/api/follows", get(handlers::get_follow_list).post(handlers::follow))
        .route("/api/follows/:code", axum::routing::delete(handlers::unfollow))
        .route("/api/follows/:code/cost", put(handlers::set_cost))
        .route("/api/follows/:code/alarm", put(handlers::set_alarm))
        .route("/api/follows/:code/sort", put(handlers::set_sort))

        // ================================================================
        // Alerts
        // ================================================================
        .route(
            "/api/alerts",
            get(handlers::get_alerts).post(handlers::create_alert),
        )
        .route("/api/alerts/:id", axum::routing::delete(handlers::delete_alert))
        .route("/api/alerts/:id/active", put(handlers::set_alert_active))

        // ================================================================
        // Settings and events
        // ================================================================
        .route(
            "/api/settings",
            get(handlers::get_settings).put(handlers::update_settings),
        )
        .route("/api/events", get(handlers::event_stream))

        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Local API server manager
pub struct ApiServer {
    state: SharedState,
    shutdown_tx: Option<oneshot::Sender<()>>,
    local_addr: Option<SocketAddr>,
}

impl ApiServer {
    pub fn new(state: SharedState) -> Self {
        Self {
            state,
            shutdown_tx: None,
            local_addr: None,
        }
    }

    /// Start the server. Returns once the listener is bound.
    pub async fn start(&mut self, config: ApiConfig) -> Result<()> {
        if !config.enabled {
            info!("Local API server is disabled");
            return Ok(());
        }

        let addr: SocketAddr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid API address: {}", e)))?;

        let app = router(self.state.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        info!("Starting QuoteWatch API server on {}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        self.local_addr = Some(listener.local_addr()?);
        self.shutdown_tx = Some(shutdown_tx);

        tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("API server shutting down");
            });

            if let Err(e) = server.await {
                error!("API server error: {}", e);
            }
        });

        if let Some(bound) = self.local_addr {
            info!("=== Endpoints ===");
            info!("  GET  http://{}/health", bound);
            info!("  GET  http://{}/api/stocks", bound);
            info!("  GET  http://{}/api/stocks/search?q=", bound);
            info!("  GET  http://{}/api/follows", bound);
            info!("  GET  http://{}/api/alerts", bound);
            info!("  GET  http://{}/api/settings", bound);
            info!("  GET  http://{}/api/events (SSE)", bound);
        }

        Ok(())
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Stop the server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            info!("API server stop signal sent");
        }
    }

    /// Check if server is running
    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some()
    }
}

impl Drop for ApiServer {
    fn drop(&mut self) {
        self.stop();
    }
}
