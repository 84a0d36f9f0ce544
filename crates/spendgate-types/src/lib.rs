//! Spendgate Types - Canonical domain types for agent payment governance
//!
//! This crate contains the foundational types for Spendgate with zero
//! dependencies on other spendgate crates:
//!
//! - Budget policies and the per-agent policy table
//! - Proposed transactions and evaluation verdicts
//! - Ledger records, query filters, and aggregate stats
//!
//! # Architectural Invariants
//!
//! 1. Exactly one policy applies per evaluation: the agent's own entry
//!    or the restrictive fallback, never both
//! 2. Verdicts are closed and binary (allow/deny), with deterministic
//!    reasons
//! 3. Ledger records are immutable once written; denials are recorded
//!    alongside approvals

pub mod ledger;
pub mod policy;
pub mod transaction;

pub use ledger::*;
pub use policy::*;
pub use transaction::*;
