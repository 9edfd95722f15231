//! Transactional settlement workflows.
//!
//! Each workflow runs as one store transaction: it loads and locks the rows
//! it needs, applies the entity rules from [`crate::ledger`] and
//! [`crate::tournament`], persists the outcome and commits. Any failure rolls
//! the whole transaction back.

pub mod errors;
pub mod manager;

pub use errors::{SettlementError, SettlementResult};
pub use manager::SettlementManager;
