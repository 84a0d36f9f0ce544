//! The policy decision engine.
//!
//! `evaluate` is a pure decision function: given a proposed transaction,
//! the policy table, and a window-spend query capability, it returns an
//! allow/deny verdict with a reason and the matched policy name. It never
//! writes to the ledger itself.

use async_trait::async_trait;
use spendgate_types::{Policy, PolicyTable, Transaction, Verdict};

use crate::Result;

/// Trailing one-hour window, in milliseconds.
pub const HOUR_MS: i64 = 3_600_000;
/// Trailing one-day window, in milliseconds.
pub const DAY_MS: i64 = 86_400_000;

/// Rolling-window spend lookup, injected into the evaluator.
///
/// Implementations return the sum of `amount` over all **allowed** records
/// for the agent whose timestamp falls within the trailing `window_ms`,
/// and `0.0` for an agent with no history. The narrow seam keeps the
/// evaluator testable against an in-memory fake.
#[async_trait]
pub trait SpendQuery: Send + Sync {
    async fn spend_in_window(&self, agent_id: &str, window_ms: i64) -> Result<f64>;
}

/// The policy decision engine.
///
/// Holds the immutable fallback policy applied when an agent has no entry
/// in the table, constructed once and reused for every evaluation.
#[derive(Debug, Clone)]
pub struct Evaluator {
    fallback: Policy,
}

impl Evaluator {
    pub fn new() -> Self {
        Self {
            fallback: Policy::fallback(),
        }
    }

    /// The policy governing `agent_id`: its table entry, or the fallback.
    pub fn resolve<'a>(&'a self, policies: &'a PolicyTable, agent_id: &str) -> &'a Policy {
        match policies.get(agent_id) {
            Some(policy) => policy,
            None => &self.fallback,
        }
    }

    /// Evaluate a proposed transaction.
    ///
    /// Rules run in strict order and the first failing rule wins: resource
    /// allowlist, per-transaction limit, trailing-hour budget, then
    /// trailing-day budget. The O(1) checks come first; each window check
    /// costs a ledger scan. Amounts equal to a limit pass; only strictly
    /// greater spend is denied.
    ///
    /// A spend-query failure propagates as an error, never as a verdict.
    pub async fn evaluate(
        &self,
        tx: &Transaction,
        policies: &PolicyTable,
        spend: &dyn SpendQuery,
    ) -> Result<Verdict> {
        let policy = self.resolve(policies, &tx.agent_id);
        let budget = &policy.budget;

        if !policy.allows_resource(&tx.resource_url) {
            return Ok(Verdict::deny(
                format!("resource {} not allowed", tx.resource_url),
                policy.name.as_str(),
            ));
        }

        if tx.amount > budget.max_per_transaction {
            return Ok(Verdict::deny(
                format!(
                    "amount exceeds per-transaction limit ({} > {})",
                    tx.amount, budget.max_per_transaction
                ),
                policy.name.as_str(),
            ));
        }

        let spent_hour = spend.spend_in_window(&tx.agent_id, HOUR_MS).await?;
        if spent_hour + tx.amount > budget.max_per_hour {
            return Ok(Verdict::deny(
                format!(
                    "hourly spend would exceed limit ({} > {})",
                    spent_hour + tx.amount,
                    budget.max_per_hour
                ),
                policy.name.as_str(),
            ));
        }

        let spent_day = spend.spend_in_window(&tx.agent_id, DAY_MS).await?;
        if spent_day + tx.amount > budget.max_per_day {
            return Ok(Verdict::deny(
                format!(
                    "daily spend would exceed limit ({} > {})",
                    spent_day + tx.amount,
                    budget.max_per_day
                ),
                policy.name.as_str(),
            ));
        }

        Ok(Verdict::allow(
            "transaction within policy limits",
            policy.name.as_str(),
        ))
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}
