//! Store error types.

use thiserror::Error;

/// PostgreSQL SQLSTATE for `lock_not_available` (lock_timeout exceeded)
const LOCK_NOT_AVAILABLE: &str = "55P03";

/// PostgreSQL SQLSTATE for `deadlock_detected`
const DEADLOCK_DETECTED: &str = "40P01";

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Insert hit an existing primary key
    #[error("Row already exists")]
    AlreadyExists,

    /// Lock wait limit exceeded
    #[error("Lock wait timeout exceeded")]
    LockTimeout,

    /// Store detected a deadlock and aborted this transaction
    #[error("Deadlock detected")]
    Deadlock,

    /// Database error
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// Stored document could not be encoded or decoded
    #[error("Corrupt stored document: {0}")]
    Corrupt(#[from] serde_json::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let code = err
            .as_database_error()
            .and_then(|db_err| db_err.code())
            .map(|code| code.into_owned());

        match code.as_deref() {
            Some(LOCK_NOT_AVAILABLE) => StoreError::LockTimeout,
            Some(DEADLOCK_DETECTED) => StoreError::Deadlock,
            _ => StoreError::Database(err),
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
