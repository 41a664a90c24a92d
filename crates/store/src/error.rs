//! Store error types.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no transaction found with id {0}")]
    NotFound(String),

    #[error("transaction already exists with id {0}")]
    Duplicate(String),

    #[error("store lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("corrupt transaction row {id}: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }
}
