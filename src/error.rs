use thiserror::Error;

/// Every failure the ledger can surface, classified so the caller can always
/// tell the kind apart: bad input, missing record, retryable contention, or
/// a store failure that is not safe to blindly retry.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

impl LedgerError {
    /// True when retrying the whole operation from scratch may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Conflict(_))
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode::{DatabaseBusy, DatabaseLocked};
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == DatabaseBusy || e.code == DatabaseLocked =>
            {
                LedgerError::Conflict(err.to_string())
            }
            _ => LedgerError::Persistence(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Persistence(format!("stored document is malformed: {err}"))
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Persistence(err.to_string())
    }
}

impl From<csv::Error> for LedgerError {
    fn from(err: csv::Error) -> Self {
        LedgerError::Persistence(err.to_string())
    }
}
