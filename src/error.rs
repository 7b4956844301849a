use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised by the backlog ledger.
///
/// Every variant is terminal for the operation that produced it; the ledger
/// is left exactly as it was before the call.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unknown subject '{0}'")]
    UnknownSubject(String),

    #[error("subject '{0}' already exists")]
    DuplicateSubject(String),

    #[error("subject '{subject}' was last updated on {last_updated}, after {today}")]
    InvalidDateOrder {
        subject: String,
        last_updated: NaiveDate,
        today: NaiveDate,
    },

    #[error("record store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

/// Failures reported by a record store or the snapshot files.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("store is not open")]
    Closed,

    #[error("store is unavailable")]
    Unavailable,

    #[error("snapshot error: {0}")]
    Snapshot(#[from] bincode::Error),
}

pub type LedgerResult<T> = Result<T, LedgerError>;
