//! Error types for the database abstraction layer
//!
//! Every failure surfaced by this crate carries an explicit kind so that
//! callers can branch on the cause without string matching.

/// Result type alias for connection operations
pub type DbalResult<T> = Result<T, ConnectionError>;

/// Errors raised by connection and transaction operations
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Commit or rollback was called with no transaction open
    #[error("There is no active transaction")]
    NoActiveTransaction,

    /// Commit was attempted at the outermost level while the transaction
    /// is marked rollback-only
    #[error("Transaction commit failed because the transaction has been marked for rollback only")]
    CommitFailedRollbackOnly,

    /// The nesting mode cannot change while a transaction is open
    #[error("May not alter the savepoint nesting behavior while a transaction is open")]
    TransactionActive,

    /// A savepoint operation was requested on a driver without the capability
    #[error("Savepoints are not supported by this driver.")]
    SavepointsNotSupported,

    /// Failure surfaced by the underlying statement executor, propagated unchanged
    #[error("Driver error: {0}")]
    Driver(String),
}

impl ConnectionError {
    /// True for the driver-originated class of errors, as opposed to
    /// transaction-state errors raised by this crate itself
    pub fn is_driver_error(&self) -> bool {
        matches!(self, ConnectionError::Driver(_))
    }
}

// Convert from sqlx errors
impl From<sqlx::Error> for ConnectionError {
    fn from(err: sqlx::Error) -> Self {
        ConnectionError::Driver(err.to_string())
    }
}

// Convert from anyhow errors
impl From<anyhow::Error> for ConnectionError {
    fn from(err: anyhow::Error) -> Self {
        ConnectionError::Driver(err.to_string())
    }
}
