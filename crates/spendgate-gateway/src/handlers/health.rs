//! Health and stats readout.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::error::GatewayResult;
use crate::state::AppState;

/// Aggregate health readout.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Loaded agent-specific policies (the fallback is not counted).
    pub policies: usize,
    pub transactions: i64,
    pub total_volume: f64,
    pub agents: i64,
}

/// Service status plus ledger aggregates.
pub async fn health(State(state): State<Arc<AppState>>) -> GatewayResult<Json<HealthResponse>> {
    let stats = state.ledger.stats().await?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        policies: state.policies.len(),
        transactions: stats.count,
        total_volume: stats.total_volume,
        agents: stats.agents,
    }))
}
