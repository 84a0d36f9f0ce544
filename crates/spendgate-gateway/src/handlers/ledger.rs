//! Ledger query handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use spendgate_types::RecordFilters;

use crate::error::GatewayResult;
use crate::state::AppState;

/// Query parameters for `/transactions`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsQuery {
    pub agent_id: Option<String>,
    pub since: Option<i64>,
    pub limit: Option<u32>,
}

/// Read ledger records, newest first.
pub async fn transactions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TransactionsQuery>,
) -> GatewayResult<Json<Value>> {
    let filters = RecordFilters {
        agent_id: query.agent_id,
        since: query.since,
        limit: query.limit,
    };
    let records = state.ledger.transactions(&filters).await?;
    Ok(Json(json!({ "transactions": records })))
}
