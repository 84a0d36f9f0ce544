//! Budget policies and the agent policy table.
//!
//! A policy binds an agent to spending limits, a resource allowlist, and a
//! violation disposition. Policies are loaded once at startup and are
//! immutable afterwards, so concurrent evaluations read them without
//! synchronization.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Spending limits, each enforced independently.
///
/// The hourly and daily limits apply to trailing windows measured backward
/// from evaluation time, not to calendar hours or days.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Budget {
    pub max_per_transaction: f64,
    pub max_per_hour: f64,
    pub max_per_day: f64,
}

/// Disposition when a policy rule is violated.
///
/// Informational: the evaluator denies on any violated rule regardless;
/// this field signals how the caller should escalate the denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnViolation {
    Block,
    Alert,
    BlockAndAlert,
}

impl OnViolation {
    /// Whether this disposition asks for an alert in addition to blocking.
    pub fn alerts(&self) -> bool {
        matches!(self, Self::Alert | Self::BlockAndAlert)
    }
}

/// A spending policy for a single agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Policy {
    /// Audit label attached to every decision this policy produces.
    pub name: String,
    pub budget: Budget,
    /// Resource-URL prefixes the agent may pay for; the literal `*`
    /// matches any resource.
    pub allowed_resources: Vec<String>,
    pub on_violation: OnViolation,
}

impl Policy {
    /// The restrictive fallback applied when no agent-specific policy
    /// exists: $1/tx, $10/hour, $50/day, any resource, block and alert.
    pub fn fallback() -> Self {
        Self {
            name: "default".to_string(),
            budget: Budget {
                max_per_transaction: 1.0,
                max_per_hour: 10.0,
                max_per_day: 50.0,
            },
            allowed_resources: vec!["*".to_string()],
            on_violation: OnViolation::BlockAndAlert,
        }
    }

    /// Whether `resource_url` starts with one of the allowed prefixes.
    ///
    /// Matching is a case-sensitive byte prefix, not URL normalization:
    /// `https://api.service.com` matches `https://api.service.com/endpoint`
    /// and also `https://api.service.com.evil.com`; scoping the prefix
    /// (e.g. a trailing `/`) is the policy author's responsibility.
    pub fn allows_resource(&self, resource_url: &str) -> bool {
        self.allowed_resources
            .iter()
            .any(|r| r == "*" || resource_url.starts_with(r.as_str()))
    }
}

/// Immutable mapping from agent id to its policy.
///
/// The fallback policy is deliberately not stored here; a lookup miss is
/// an explicit branch in the evaluator, not nullable-map semantics.
#[derive(Debug, Clone, Default)]
pub struct PolicyTable {
    policies: HashMap<String, Policy>,
}

impl PolicyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, agent_id: impl Into<String>, policy: Policy) {
        self.policies.insert(agent_id.into(), policy);
    }

    pub fn get(&self, agent_id: &str) -> Option<&Policy> {
        self.policies.get(agent_id)
    }

    /// Number of agent-specific policies (the fallback is not counted).
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl FromIterator<(String, Policy)> for PolicyTable {
    fn from_iter<I: IntoIterator<Item = (String, Policy)>>(iter: I) -> Self {
        Self {
            policies: iter.into_iter().collect(),
        }
    }
}
