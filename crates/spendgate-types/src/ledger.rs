//! Ledger record and query types.

use serde::{Deserialize, Serialize};

use crate::Decision;

/// An immutable audit entry combining a transaction and its verdict.
///
/// Records are assigned a monotonically increasing id and a millisecond
/// epoch timestamp when written. They are never updated or deleted;
/// denials are recorded alongside approvals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRecord {
    pub id: i64,
    pub agent_id: String,
    pub resource_url: String,
    pub amount: f64,
    pub currency: String,
    pub scheme: String,
    /// Milliseconds since the Unix epoch, assigned at write time.
    pub timestamp: i64,
    pub decision: Decision,
    pub reason: String,
    pub matched_policy: String,
}

/// Filters for ledger queries; an absent filter imposes no constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFilters {
    pub agent_id: Option<String>,
    /// Inclusive lower bound on the record timestamp, epoch milliseconds.
    pub since: Option<i64>,
    /// Maximum number of records returned.
    pub limit: Option<u32>,
}

impl RecordFilters {
    /// Restrict to a single agent.
    pub fn for_agent(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: Some(agent_id.into()),
            ..Self::default()
        }
    }
}

/// Aggregate readout over the whole ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerStats {
    pub count: i64,
    /// Sum of `amount` across all records regardless of verdict.
    pub total_volume: f64,
    /// Number of distinct agent ids seen.
    pub agents: i64,
}
