//! Request handlers for the gateway surface.

pub mod health;
pub mod ledger;
pub mod payments;
