use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error};

use txwatch_core::{new_transaction_id, MonotonicClock, NewTransaction, Transaction, TransactionType};
use txwatch_store::TransactionStore;

use crate::error::IngestError;

/// Accepts client submissions, persists them, and queues them for detection.
///
/// The detection queue is bounded: when it is full, `create_transaction`
/// waits for room, so a stalled detector slows ingestion down.
pub struct IngestionService {
    store: Arc<dyn TransactionStore>,
    publisher: mpsc::Sender<Transaction>,
    clock: MonotonicClock,
}

impl IngestionService {
    pub fn new(store: Arc<dyn TransactionStore>, publisher: mpsc::Sender<Transaction>) -> Self {
        Self {
            store,
            publisher,
            clock: MonotonicClock::new(),
        }
    }

    /// Validate and persist `raw`, then hand it to the detection queue.
    ///
    /// The ID and timestamp are always assigned here. Nothing is published
    /// unless the insert succeeded.
    pub async fn create_transaction(&self, raw: NewTransaction) -> Result<Transaction, IngestError> {
        let id = new_transaction_id();

        if raw.transaction_type.is_empty() {
            return Err(IngestError::Validation("transaction type is required".into()));
        }
        let transaction_type: TransactionType = raw
            .transaction_type
            .parse()
            .map_err(|e| IngestError::Validation(format!("{}", e)))?;

        if raw.user_id.is_empty() {
            return Err(IngestError::Validation("userId is required".into()));
        }

        let tx = Transaction::new(id, raw.user_id, raw.amount, transaction_type, self.clock.now());
        self.store.append(&tx).await?;
        debug!(tx_id = %tx.id, user_id = %tx.user_id, amount = tx.amount, kind = %tx.transaction_type, "Transaction stored");

        // The row is already durable, so a closed queue only costs the detection pass.
        if self.publisher.send(tx.clone()).await.is_err() {
            error!(tx_id = %tx.id, "Detection queue closed, transaction will not be evaluated");
        }

        Ok(tx)
    }
}
