//! Proposed transactions and evaluation verdicts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A payment an agent proposes to make.
///
/// Built once per inbound verification call and never mutated afterwards;
/// the evaluator consumes it and the gateway turns it into a ledger record
/// together with the verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub agent_id: String,
    pub resource_url: String,
    pub amount: f64,
    pub currency: String,
    pub scheme: String,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of a policy evaluation. Closed and binary; there is no
/// partial or pending state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
        }
    }
}

/// The verdict returned by the policy evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub decision: Decision,
    /// Human-readable explanation, deterministic for identical inputs.
    pub reason: String,
    /// Name of the policy that produced the decision (`"default"` when the
    /// fallback applied).
    pub matched_policy: String,
}

impl Verdict {
    pub fn allow(reason: impl Into<String>, matched_policy: impl Into<String>) -> Self {
        Self {
            decision: Decision::Allow,
            reason: reason.into(),
            matched_policy: matched_policy.into(),
        }
    }

    pub fn deny(reason: impl Into<String>, matched_policy: impl Into<String>) -> Self {
        Self {
            decision: Decision::Deny,
            reason: reason.into(),
            matched_policy: matched_policy.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_wire_format() {
        assert_eq!(serde_json::to_string(&Decision::Allow).unwrap(), "\"allow\"");
        assert_eq!(serde_json::to_string(&Decision::Deny).unwrap(), "\"deny\"");
        assert_eq!(Decision::Deny.as_str(), "deny");
        assert!(Decision::Allow.is_allow());
    }

    #[test]
    fn transaction_serializes_camel_case() {
        let tx = Transaction {
            agent_id: "bot-1".to_string(),
            resource_url: "https://api.example.com/data".to_string(),
            amount: 2.5,
            currency: "USDC".to_string(),
            scheme: "exact".to_string(),
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(&tx).unwrap();
        assert_eq!(value["agentId"], "bot-1");
        assert_eq!(value["resourceUrl"], "https://api.example.com/data");
    }
}
