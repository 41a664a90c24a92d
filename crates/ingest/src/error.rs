use thiserror::Error;

use txwatch_store::StoreError;

#[derive(Debug, Error)]
pub enum IngestError {
    /// The submitted payload is missing or has an invalid field.
    #[error("{0}")]
    Validation(String),

    /// A transaction with the assigned ID already exists.
    #[error("{0}")]
    Conflict(String),

    #[error("failed to store transaction: {0}")]
    Store(StoreError),
}

impl From<StoreError> for IngestError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(_) => Self::Conflict(err.to_string()),
            other => Self::Store(other),
        }
    }
}
