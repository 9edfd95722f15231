//! Settlement error types.

use thiserror::Error;

use crate::db::StoreError;
use crate::ledger::Conflict;

/// Settlement workflow errors
#[derive(Debug, Error)]
pub enum SettlementError {
    /// A ledger rule rejected the request
    #[error(transparent)]
    Conflict(#[from] Conflict),

    /// The store failed; the transaction was rolled back
    #[error("Store failure: {0}")]
    Fault(#[from] StoreError),
}

impl SettlementError {
    /// Get the conflict, if this is a rule rejection
    pub fn conflict(&self) -> Option<Conflict> {
        match self {
            SettlementError::Conflict(conflict) => Some(*conflict),
            SettlementError::Fault(_) => None,
        }
    }

    /// Whether this is a store failure
    pub fn is_fault(&self) -> bool {
        matches!(self, SettlementError::Fault(_))
    }

    /// Get a sanitized error message safe for client display
    ///
    /// Store failures are reported generically so connection strings and
    /// SQL never reach a client.
    pub fn client_message(&self) -> String {
        match self {
            SettlementError::Conflict(conflict) => conflict.to_string(),
            SettlementError::Fault(_) => "Internal server error".to_string(),
        }
    }
}

/// Result type for settlement workflows
pub type SettlementResult<T> = Result<T, SettlementError>;
