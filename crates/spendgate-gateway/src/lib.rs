//! Spendgate Gateway - HTTP surface for the payment policy proxy
//!
//! Sits between agents and an x402 payment facilitator:
//!
//! - `POST /verify`: evaluate the proposed payment against the agent's
//!   budget policy, record the verdict, and forward approved payloads
//!   upstream
//! - `POST /settle`: forward unconditionally, trusting a prior
//!   successful verification
//! - `GET /transactions`: query the decision ledger
//! - `GET /health`: service status and ledger aggregates
//!
//! # Invariants
//!
//! 1. A denied payment never reaches the facilitator
//! 2. An upstream failure is never reported as a policy denial
//! 3. A decision that cannot be durably recorded fails the request

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod upstream;

pub use error::{GatewayError, GatewayResult};
pub use routes::router;
pub use state::AppState;
pub use upstream::{UpstreamClient, UpstreamError, DEFAULT_UPSTREAM_TIMEOUT};
