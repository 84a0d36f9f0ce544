//! Application state shared across handlers.

use spendgate_ledger::Ledger;
use spendgate_policy::Evaluator;
use spendgate_types::PolicyTable;

use crate::upstream::UpstreamClient;

/// Shared application state.
///
/// The policy table and evaluator are immutable after startup and read by
/// concurrent evaluations without synchronization; the ledger is the only
/// mutable shared resource.
pub struct AppState {
    pub policies: PolicyTable,
    pub evaluator: Evaluator,
    pub ledger: Ledger,
    pub upstream: UpstreamClient,
}

impl AppState {
    pub fn new(policies: PolicyTable, ledger: Ledger, upstream: UpstreamClient) -> Self {
        Self {
            policies,
            evaluator: Evaluator::new(),
            ledger,
            upstream,
        }
    }
}
