//! Spendgate SDK - Agent-side client for policy-governed x402 payments
//!
//! Thin reqwest wrapper that routes an agent's payment verifications
//! through a Spendgate proxy, surfacing policy denials as typed errors.
//!
//! # Quick Start
//!
//! ```ignore
//! use spendgate_sdk::{PaymentRequest, SpendgateClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SpendgateClient::new("research-bot")?;
//!
//!     let outcome = client
//!         .verify(&PaymentRequest::new("https://api.weather.com/forecast", 0.25))
//!         .await?;
//!     println!("approved under policy {}", outcome.policy);
//!
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use spendgate_types::LedgerRecord;

/// Header carrying the agent identity on every proxy call.
pub const AGENT_HEADER: &str = "X-Spendgate-Agent";

// ============================================================================
// Error Types
// ============================================================================

/// SDK-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("policy violation: {reason} (policy: {policy})")]
    PolicyViolation {
        reason: String,
        policy: String,
        agent_id: String,
    },

    #[error("proxy error: {status} - {message}")]
    Api { status: u16, message: String },
}

/// SDK result type.
pub type SdkResult<T> = std::result::Result<T, SdkError>;

// ============================================================================
// Configuration
// ============================================================================

/// SDK configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Stable identifier for this agent.
    pub agent_id: String,
    /// Spendgate proxy URL.
    pub proxy: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl Config {
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            proxy: "http://localhost:4020".to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = proxy.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ============================================================================
// API Types
// ============================================================================

/// A payment to submit for verification.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub resource_url: String,
    pub amount: f64,
    /// Defaults to `USDC` on the wire when absent.
    pub currency: Option<String>,
    /// Defaults to `exact` on the wire when absent.
    pub scheme: Option<String>,
    /// Opaque scheme-specific payload forwarded untouched.
    pub payload: Option<Value>,
}

impl PaymentRequest {
    pub fn new(resource_url: impl Into<String>, amount: f64) -> Self {
        Self {
            resource_url: resource_url.into(),
            amount,
            currency: None,
            scheme: None,
            payload: None,
        }
    }
}

/// Result of a verification that passed policy.
#[derive(Debug, Clone)]
pub struct VerifyOutcome {
    /// Matched policy name when the proxy reports one, `"unknown"` otherwise.
    pub policy: String,
    /// The upstream facilitator's response, verbatim.
    pub upstream: Value,
}

/// Proxy health readout.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    pub status: String,
    pub version: String,
    pub policies: u64,
    pub transactions: i64,
    pub total_volume: f64,
    pub agents: i64,
}

// ============================================================================
// Main Client
// ============================================================================

/// Client for a Spendgate proxy.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct SpendgateClient {
    config: Config,
    http: reqwest::Client,
}

impl SpendgateClient {
    /// Connect to the default local proxy (`http://localhost:4020`).
    pub fn new(agent_id: impl Into<String>) -> SdkResult<Self> {
        Self::with_config(Config::new(agent_id))
    }

    /// Create with custom configuration.
    pub fn with_config(mut config: Config) -> SdkResult<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        config.proxy = config.proxy.trim_end_matches('/').to_string();
        Ok(Self { config, http })
    }

    /// Submit a payment for verification through the proxy.
    ///
    /// The amount travels as a string, per the x402 wire convention. A 403
    /// becomes [`SdkError::PolicyViolation`]; any other non-success status
    /// becomes [`SdkError::Api`].
    pub async fn verify(&self, payment: &PaymentRequest) -> SdkResult<VerifyOutcome> {
        let mut body = json!({
            "resourceUrl": payment.resource_url,
            "amount": payment.amount.to_string(),
            "currency": payment.currency.as_deref().unwrap_or("USDC"),
            "scheme": payment.scheme.as_deref().unwrap_or("exact"),
        });
        if let Some(payload) = &payment.payload {
            body["payload"] = payload.clone();
        }

        let response = self
            .http
            .post(format!("{}/verify", self.config.proxy))
            .header(AGENT_HEADER, &self.config.agent_id)
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body: Value = response.json().await?;

        if status == 403 {
            return Err(SdkError::PolicyViolation {
                reason: body["reason"].as_str().unwrap_or("unknown").to_string(),
                policy: body["policy"].as_str().unwrap_or("unknown").to_string(),
                agent_id: self.config.agent_id.clone(),
            });
        }
        if status >= 400 {
            return Err(SdkError::Api {
                status,
                message: body["message"]
                    .as_str()
                    .unwrap_or("request failed")
                    .to_string(),
            });
        }

        Ok(VerifyOutcome {
            policy: body["matchedPolicy"]
                .as_str()
                .unwrap_or("unknown")
                .to_string(),
            upstream: body,
        })
    }

    /// Forward a settlement payload through the proxy.
    pub async fn settle(&self, payload: &Value) -> SdkResult<Value> {
        let response = self
            .http
            .post(format!("{}/settle", self.config.proxy))
            .header(AGENT_HEADER, &self.config.agent_id)
            .json(payload)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body: Value = response.json().await?;
        if status >= 400 {
            return Err(SdkError::Api {
                status,
                message: body["message"]
                    .as_str()
                    .unwrap_or("request failed")
                    .to_string(),
            });
        }
        Ok(body)
    }

    /// Check proxy health.
    pub async fn health(&self) -> SdkResult<HealthSnapshot> {
        let response = self
            .http
            .get(format!("{}/health", self.config.proxy))
            .send()
            .await?;
        Ok(response.json().await?)
    }

    /// Transaction history for this agent, newest first.
    pub async fn transactions(
        &self,
        since: Option<i64>,
        limit: Option<u32>,
    ) -> SdkResult<Vec<LedgerRecord>> {
        #[derive(Deserialize)]
        struct TransactionsResponse {
            transactions: Vec<LedgerRecord>,
        }

        let mut query = vec![("agentId".to_string(), self.config.agent_id.clone())];
        if let Some(since) = since {
            query.push(("since".to_string(), since.to_string()));
        }
        if let Some(limit) = limit {
            query.push(("limit".to_string(), limit.to_string()));
        }

        let response = self
            .http
            .get(format!("{}/transactions", self.config.proxy))
            .query(&query)
            .send()
            .await?;

        let body: TransactionsResponse = response.json().await?;
        Ok(body.transactions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = Config::new("research-bot");
        assert_eq!(config.proxy, "http://localhost:4020");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn trailing_slash_is_trimmed_from_proxy_url() {
        let client =
            SpendgateClient::with_config(Config::new("bot").with_proxy("http://proxy:4020/"))
                .unwrap();
        assert_eq!(client.config.proxy, "http://proxy:4020");
    }

    #[test]
    fn policy_violation_display_names_the_policy() {
        let err = SdkError::PolicyViolation {
            reason: "resource https://api.evil.com not allowed".to_string(),
            policy: "test-bot-policy".to_string(),
            agent_id: "test-bot".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("not allowed"));
        assert!(message.contains("test-bot-policy"));
    }
}
