//! Spendgate Policy - Agent budget policy loading and evaluation
//!
//! Two halves, both side-effect free:
//!
//! - The loader parses a YAML mapping of agent id to policy into a
//!   validated [`PolicyTable`](spendgate_types::PolicyTable)
//! - The evaluator decides allow/deny for a proposed transaction against
//!   that table, querying rolling-window spend through the injected
//!   [`SpendQuery`] capability
//!
//! # Invariants
//!
//! 1. Exactly one policy applies per evaluation: the agent's entry or the
//!    fallback
//! 2. Rules run in strict order; the first failing rule wins
//! 3. Malformed policy input fails loudly, never silently defaults

pub mod evaluator;
pub mod loader;

pub use evaluator::{Evaluator, SpendQuery, DAY_MS, HOUR_MS};
pub use loader::{load_policies, parse_policies};

use thiserror::Error;

/// Errors from policy loading and evaluation.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("failed to read policy file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid policy file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid policy for agent {agent}: {message}")]
    Validation { agent: String, message: String },

    #[error("spend window query failed: {0}")]
    SpendQuery(String),
}

pub type Result<T> = std::result::Result<T, PolicyError>;
