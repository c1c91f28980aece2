use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::state::AppState;
use crate::telemetry::{PerformanceReport, RecentTrade, SystemStatus};

const DEFAULT_TRADE_LIMIT: usize = 20;
const MAX_TRADE_LIMIT: usize = 500;

#[derive(Debug, Deserialize)]
pub struct TradesQuery {
    pub limit: Option<usize>,
}

/// GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "uptimeSecs": state.uptime_seconds(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /api/system/status
pub async fn get_system_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(state.service.system_status().await)
}

/// GET /api/trades/recent?limit=N
pub async fn get_recent_trades(
    State(state): State<AppState>,
    Query(query): Query<TradesQuery>,
) -> Json<Vec<RecentTrade>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_TRADE_LIMIT)
        .clamp(1, MAX_TRADE_LIMIT);
    Json(state.service.recent_trades(limit).await)
}

/// GET /api/performance
pub async fn get_performance(State(state): State<AppState>) -> Json<PerformanceReport> {
    Json(state.service.performance().await)
}
