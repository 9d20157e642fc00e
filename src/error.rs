use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

/// Failures reported by a metadata or chunk store adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    /// A write violated a key or reference constraint.
    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(db)
                if db.is_unique_violation() || db.is_foreign_key_violation() || db.is_check_violation() =>
            {
                StoreError::Constraint(db.message().to_string())
            }
            other => StoreError::Database(other),
        }
    }
}

/// Errors surfaced by the upload, download, listing and delete operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing upload payload.
    #[error("invalid input: {0}")]
    Input(String),

    #[error("payload exceeds the {limit} byte upload limit")]
    TooLarge { limit: u64 },

    #[error("file {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The upload stream failed before reaching end-of-stream.
    #[error("failed to read upload stream: {0}")]
    Read(#[source] std::io::Error),

    /// Fewer chunks could be read back than the record declares, or the
    /// record was never marked ready.
    #[error("file {file_id} is incomplete, missing chunks {missing:?}")]
    IncompleteFile { file_id: Uuid, missing: Vec<i32> },

    /// Some chunk writes failed; the upload was discarded.
    #[error("upload of file {file_id} failed for chunks {failed:?}")]
    PartialUpload { file_id: Uuid, failed: Vec<i32> },
}

impl Error {
    /// Whether the failure was caused by the caller rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::Input(_) | Error::TooLarge { .. } | Error::NotFound(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
