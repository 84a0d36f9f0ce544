//! Payment verification and settlement handlers.
//!
//! `/verify` runs the full decision path: build the transaction from the
//! x402 payload, evaluate it, record the verdict (allow and deny alike),
//! then forward approved payloads upstream. `/settle` only forwards; it
//! trusts a prior successful verification.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use spendgate_types::Transaction;

use crate::error::GatewayResult;
use crate::state::AppState;

/// Header carrying the calling agent's identity.
pub const AGENT_HEADER: &str = "x-spendgate-agent";

fn agent_id(headers: &HeaderMap) -> String {
    headers
        .get(AGENT_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

/// Build the proposed transaction from an x402 verification payload.
///
/// Field fallbacks mirror the x402 wire format: `resourceUrl` else
/// `resource`; `amount` else `maxAmountRequired`, numeric or string, with
/// unparseable values treated as zero.
fn transaction_from_payload(agent_id: String, payload: &Value) -> Transaction {
    let resource_url = payload["resourceUrl"]
        .as_str()
        .or_else(|| payload["resource"].as_str())
        .unwrap_or("")
        .to_string();
    let amount = parse_amount(
        payload
            .get("amount")
            .or_else(|| payload.get("maxAmountRequired")),
    );

    Transaction {
        agent_id,
        resource_url,
        amount,
        currency: payload["currency"].as_str().unwrap_or("USDC").to_string(),
        scheme: payload["scheme"].as_str().unwrap_or("exact").to_string(),
        timestamp: Utc::now(),
    }
}

fn parse_amount(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Intercept an x402 payment verification.
pub async fn verify(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> GatewayResult<Response> {
    let tx = transaction_from_payload(agent_id(&headers), &payload);

    let verdict = state
        .evaluator
        .evaluate(&tx, &state.policies, &state.ledger)
        .await?;

    // Both outcomes are recorded before any response leaves the gateway.
    state.ledger.record(&tx, &verdict).await?;

    if !verdict.decision.is_allow() {
        let policy = state.evaluator.resolve(&state.policies, &tx.agent_id);
        if policy.on_violation.alerts() {
            tracing::warn!(
                agent = %tx.agent_id,
                policy = %verdict.matched_policy,
                reason = %verdict.reason,
                "payment denied"
            );
        } else {
            tracing::info!(
                agent = %tx.agent_id,
                policy = %verdict.matched_policy,
                "payment denied"
            );
        }

        return Ok((
            StatusCode::FORBIDDEN,
            Json(json!({
                "error": "policy_violation",
                "reason": verdict.reason,
                "policy": verdict.matched_policy,
                "agentId": tx.agent_id,
            })),
        )
            .into_response());
    }

    let (status, body) = state
        .upstream
        .verify(&payload, authorization(&headers))
        .await?;
    Ok(proxied(status, body))
}

/// Forward an x402 settlement untouched. No evaluation and no budget
/// record: settlement trusts a prior successful verification.
pub async fn settle(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> GatewayResult<Response> {
    let agent = agent_id(&headers);
    let (status, body) = state
        .upstream
        .settle(&payload, authorization(&headers))
        .await?;
    tracing::info!(agent = %agent, status, "proxied settlement");
    Ok(proxied(status, body))
}

/// Relay the upstream's status and body verbatim.
fn proxied(status: u16, body: Value) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_accepts_numbers_and_strings() {
        assert_eq!(parse_amount(Some(&json!(2.5))), 2.5);
        assert_eq!(parse_amount(Some(&json!("2.50"))), 2.5);
        assert_eq!(parse_amount(Some(&json!(" 3 "))), 3.0);
        assert_eq!(parse_amount(Some(&json!("not-a-number"))), 0.0);
        assert_eq!(parse_amount(Some(&json!(null))), 0.0);
        assert_eq!(parse_amount(None), 0.0);
    }

    #[test]
    fn payload_field_fallbacks() {
        let payload = json!({
            "resource": "https://api.example.com/data",
            "maxAmountRequired": "0.10",
        });
        let tx = transaction_from_payload("bot-1".to_string(), &payload);
        assert_eq!(tx.resource_url, "https://api.example.com/data");
        assert_eq!(tx.amount, 0.10);
        assert_eq!(tx.currency, "USDC");
        assert_eq!(tx.scheme, "exact");
    }

    #[test]
    fn explicit_fields_win_over_fallbacks() {
        let payload = json!({
            "resourceUrl": "https://a.example",
            "resource": "https://b.example",
            "amount": 1.0,
            "maxAmountRequired": "9.0",
            "currency": "USD",
            "scheme": "upto",
        });
        let tx = transaction_from_payload("bot-1".to_string(), &payload);
        assert_eq!(tx.resource_url, "https://a.example");
        assert_eq!(tx.amount, 1.0);
        assert_eq!(tx.currency, "USD");
        assert_eq!(tx.scheme, "upto");
    }
}
