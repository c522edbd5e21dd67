//! Local API endpoint handlers
//!
//! Thin adapters from HTTP onto the service layer.

use crate::api::types::*;
use crate::db::sqlite::{FollowedStock, Settings, SettingsUpdate, StockAlert, StockBasic};
use crate::services::{AlertService, DerivedStockView, SettingsService, StockService};
use crate::state::AppState;
use axum::{
    extract::{Json, Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    response::IntoResponse,
};
use futures_util::stream::{self, Stream};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

pub type SharedState = Arc<AppState>;

// ============================================================================
// Health Check
// ============================================================================

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::<Empty>::success_with_message("QuoteWatch API is running"))
}

// ============================================================================
// Stocks
// ============================================================================

/// GET /api/stocks - live views of the whole watch list
pub async fn get_stock_infos(
    State(state): State<SharedState>,
) -> ApiResult<Vec<DerivedStockView>> {
    let views = StockService::get_stock_infos(&state, &[]).await?;
    Ok(Json(ApiResponse::success_with_data(views)))
}

/// POST /api/stocks - live views of selected codes
pub async fn post_stock_infos(
    State(state): State<SharedState>,
    Json(req): Json<StockInfosRequest>,
) -> ApiResult<Vec<DerivedStockView>> {
    let views = StockService::get_stock_infos(&state, &req.codes).await?;
    Ok(Json(ApiResponse::success_with_data(views)))
}

/// GET /api/stocks/search?q= - directory lookup by name or code
pub async fn search_stocks(
    State(state): State<SharedState>,
    Query(query): Query<StockSearchQuery>,
) -> ApiResult<Vec<StockBasic>> {
    let hits = StockService::search_stocks(&state, &query.q)?;
    Ok(Json(ApiResponse::success_with_data(hits)))
}

/// POST /api/stocks/directory - bulk load the searchable directory
pub async fn import_stock_directory(
    State(state): State<SharedState>,
    Json(req): Json<StockDirectoryImport>,
) -> ApiResult<ImportSummary> {
    let imported = StockService::import_stock_basics(&state, req.stocks)?;
    info!("API imported {} directory entries", imported);
    Ok(Json(ApiResponse::success_with_data(ImportSummary { imported })))
}

// ============================================================================
// Follow List
// ============================================================================

/// GET /api/follows
pub async fn get_follow_list(
    State(state): State<SharedState>,
) -> ApiResult<Vec<FollowedStock>> {
    let follows = StockService::get_follow_list(&state)?;
    Ok(Json(ApiResponse::success_with_data(follows)))
}

/// POST /api/follows
pub async fn follow(
    State(state): State<SharedState>,
    Json(req): Json<FollowRequest>,
) -> ApiResult<FollowedStock> {
    info!("API follow {}", req.code);
    let follow = StockService::follow(&state, &req.code).await?;
    Ok(Json(ApiResponse::success_with_data(follow)))
}

/// DELETE /api/follows/:code
pub async fn unfollow(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> ApiResult<Empty> {
    info!("API unfollow {}", code);
    StockService::unfollow(&state, &code)?;
    Ok(Json(ApiResponse::success_with_message("unfollowed")))
}

/// PUT /api/follows/:code/cost
pub async fn set_cost(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Json(req): Json<CostRequest>,
) -> ApiResult<FollowedStock> {
    let follow = StockService::set_cost_price_and_volume(&state, &code, req.price, req.volume)?;
    Ok(Json(ApiResponse::success_with_data(follow)))
}

/// PUT /api/follows/:code/alarm
pub async fn set_alarm(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Json(req): Json<AlarmRequest>,
) -> ApiResult<FollowedStock> {
    let follow =
        StockService::set_alarm_change_percent(&state, &code, req.change_percent, req.price)?;
    Ok(Json(ApiResponse::success_with_data(follow)))
}

/// PUT /api/follows/:code/sort
pub async fn set_sort(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Json(req): Json<SortRequest>,
) -> ApiResult<FollowedStock> {
    let follow = StockService::set_stock_sort(&state, &code, req.sort)?;
    Ok(Json(ApiResponse::success_with_data(follow)))
}

// ============================================================================
// Alerts
// ============================================================================

/// GET /api/alerts?code=
pub async fn get_alerts(
    State(state): State<SharedState>,
    Query(query): Query<AlertQuery>,
) -> ApiResult<Vec<StockAlert>> {
    let alerts = AlertService::get_alerts(&state, query.code.as_deref())?;
    Ok(Json(ApiResponse::success_with_data(alerts)))
}

/// POST /api/alerts
pub async fn create_alert(
    State(state): State<SharedState>,
    Json(req): Json<CreateAlertRequest>,
) -> ApiResult<StockAlert> {
    let alert = AlertService::create_alert(&state, &req.code, req.alert_type, req.threshold)?;
    Ok(Json(ApiResponse::success_with_data(alert)))
}

/// DELETE /api/alerts/:id
pub async fn delete_alert(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> ApiResult<Empty> {
    AlertService::delete_alert(&state, id)?;
    Ok(Json(ApiResponse::success_with_message("deleted")))
}

/// PUT /api/alerts/:id/active
pub async fn set_alert_active(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(req): Json<AlertActiveRequest>,
) -> ApiResult<StockAlert> {
    let alert = if req.active {
        AlertService::enable_alert(&state, id)?
    } else {
        AlertService::disable_alert(&state, id)?
    };
    Ok(Json(ApiResponse::success_with_data(alert)))
}

// ============================================================================
// Settings
// ============================================================================

/// GET /api/settings
pub async fn get_settings(State(state): State<SharedState>) -> ApiResult<Settings> {
    Ok(Json(ApiResponse::success_with_data(SettingsService::get_settings(&state)?)))
}

/// PUT /api/settings
pub async fn update_settings(
    State(state): State<SharedState>,
    Json(update): Json<SettingsUpdate>,
) -> ApiResult<Settings> {
    let settings = SettingsService::update_settings(&state, update)?;
    Ok(Json(ApiResponse::success_with_data(settings)))
}

// ============================================================================
// Event Stream
// ============================================================================

/// GET /api/events - server-sent events, one per dispatched event
pub async fn event_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.events.subscribe();

    let events = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(data) => {
                        let sse = Event::default().event(event.kind().as_str()).data(data);
                        return Some((Ok(sse), rx));
                    }
                    Err(e) => warn!("Failed to encode {} event: {}", event.kind(), e),
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Event stream client lagged, {} events dropped", skipped)
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
