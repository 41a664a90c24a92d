use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use txwatch_core::{Transaction, TransactionType};
use txwatch_store::{query_with_timeout, StoreError, TransactionStore};

use super::trailing_window;
use crate::rule::Rule;

/// Fires when a user has made at least `min_consecutive` transfers within `window`.
/// Deposits and withdrawals are never flagged by this rule.
pub struct RapidTransfersRule {
    store: Arc<dyn TransactionStore>,
    min_consecutive: usize,
    window: Duration,
    lookup_timeout: Duration,
}

impl RapidTransfersRule {
    pub const NAME: &'static str = "RapidTransfers";

    pub fn new(
        store: Arc<dyn TransactionStore>,
        min_consecutive: usize,
        window: Duration,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            store,
            min_consecutive,
            window,
            lookup_timeout,
        }
    }
}

#[async_trait]
impl Rule for RapidTransfersRule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn evaluate(&self, tx: &Transaction) -> Result<bool, StoreError> {
        if tx.transaction_type != TransactionType::Transfer {
            return Ok(false);
        }

        let filter = trailing_window(tx, self.window).of_type(TransactionType::Transfer);
        let transfers = query_with_timeout(self.store.as_ref(), &filter, self.lookup_timeout).await?;

        debug!(tx_id = %tx.id, user_id = %tx.user_id, count = transfers.len(), "transfers in window");
        Ok(transfers.len() >= self.min_consecutive)
    }
}
