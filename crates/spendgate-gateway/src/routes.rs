//! Route definitions for the gateway surface.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the gateway router with `state` applied.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/verify", post(handlers::payments::verify))
        .route("/settle", post(handlers::payments::settle))
        .route("/transactions", get(handlers::ledger::transactions))
        .with_state(state)
}
