//! Upstream facilitator client.
//!
//! Thin reqwest wrapper for forwarding verification and settlement
//! payloads to the x402 facilitator. Every request carries a bounded
//! timeout, so a stalled upstream surfaces as an error rather than a hang.
//! No automatic retries; those are the caller's concern.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// Default bound on upstream request time.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors contacting the upstream facilitator, including timeouts and
/// non-JSON responses.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{0}")]
    Request(#[from] reqwest::Error),
}

/// Client for the upstream x402 facilitator.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    base: String,
    http: reqwest::Client,
}

impl UpstreamClient {
    /// `base` is the facilitator root, e.g. `https://x402.org/facilitator`.
    pub fn new(base: impl Into<String>, timeout: Duration) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let base = base.into();
        Ok(Self {
            base: base.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Forward a verification payload to `POST {base}/verify`.
    pub async fn verify(
        &self,
        payload: &Value,
        authorization: Option<&str>,
    ) -> Result<(u16, Value), UpstreamError> {
        self.post("verify", payload, authorization).await
    }

    /// Forward a settlement payload to `POST {base}/settle`.
    pub async fn settle(
        &self,
        payload: &Value,
        authorization: Option<&str>,
    ) -> Result<(u16, Value), UpstreamError> {
        self.post("settle", payload, authorization).await
    }

    /// Returns the upstream status and JSON body verbatim. reqwest and
    /// axum disagree on `http` crate versions, so the status crosses this
    /// boundary as a bare `u16`.
    async fn post(
        &self,
        endpoint: &str,
        payload: &Value,
        authorization: Option<&str>,
    ) -> Result<(u16, Value), UpstreamError> {
        let mut request = self
            .http
            .post(format!("{}/{}", self.base, endpoint))
            .json(payload);
        if let Some(auth) = authorization {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.json::<Value>().await?;
        Ok((status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_slash_from_base() {
        let client =
            UpstreamClient::new("https://x402.org/facilitator/", DEFAULT_UPSTREAM_TIMEOUT).unwrap();
        assert_eq!(client.base, "https://x402.org/facilitator");
    }
}
