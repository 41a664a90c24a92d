//! Durable transaction storage.
//!
//! [`TransactionStore`] is the contract the ingestion and detection paths
//! depend on; [`SqliteTransactionStore`] is the embedded SQLite implementation.

pub mod error;
pub mod sqlite;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use txwatch_core::{Filter, Transaction};

pub use error::StoreError;
pub use sqlite::{connect, SqliteTransactionStore};

/// Append-and-query store for transaction records. Safe for concurrent use.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Create the underlying tables and indexes if absent. Idempotent.
    async fn initialize_schema(&self) -> Result<(), StoreError>;

    /// Insert a new transaction. Fails with [`StoreError::Duplicate`] if the ID exists.
    async fn append(&self, tx: &Transaction) -> Result<(), StoreError>;

    /// All transactions matching every set predicate, newest first.
    async fn query(&self, filter: &Filter) -> Result<Vec<Transaction>, StoreError>;

    /// Overwrite the suspicion flag and rule list of one transaction.
    ///
    /// Fails with [`StoreError::NotFound`] when no row has this ID.
    async fn mark_suspicious(
        &self,
        id: &str,
        suspicious: bool,
        flagged_rules: &[String],
    ) -> Result<(), StoreError>;

    /// Point lookup by ID.
    async fn get(&self, id: &str) -> Result<Option<Transaction>, StoreError>;
}

/// Blanket implementation so `Arc<dyn TransactionStore>` can be used directly.
#[async_trait]
impl<T: TransactionStore + ?Sized> TransactionStore for Arc<T> {
    async fn initialize_schema(&self) -> Result<(), StoreError> {
        (**self).initialize_schema().await
    }

    async fn append(&self, tx: &Transaction) -> Result<(), StoreError> {
        (**self).append(tx).await
    }

    async fn query(&self, filter: &Filter) -> Result<Vec<Transaction>, StoreError> {
        (**self).query(filter).await
    }

    async fn mark_suspicious(
        &self,
        id: &str,
        suspicious: bool,
        flagged_rules: &[String],
    ) -> Result<(), StoreError> {
        (**self).mark_suspicious(id, suspicious, flagged_rules).await
    }

    async fn get(&self, id: &str) -> Result<Option<Transaction>, StoreError> {
        (**self).get(id).await
    }
}

/// Run `store.query(filter)` with an upper bound on how long it may take.
///
/// Exceeding `limit` surfaces as [`StoreError::Timeout`].
pub async fn query_with_timeout<S>(
    store: &S,
    filter: &Filter,
    limit: Duration,
) -> Result<Vec<Transaction>, StoreError>
where
    S: TransactionStore + ?Sized,
{
    tokio::time::timeout(limit, store.query(filter))
        .await
        .map_err(|_| StoreError::Timeout(limit))?
}
