use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use txwatch_core::Transaction;
use txwatch_store::{query_with_timeout, StoreError, TransactionStore};

use super::trailing_window;
use crate::rule::Rule;

/// Fires when a user makes more than `max_count` transactions below
/// `threshold_amount` within `window`.
///
/// Only small transactions are considered at all: anything at or above the
/// threshold is cleared without touching the store.
pub struct FrequentSmallTransactionsRule {
    store: Arc<dyn TransactionStore>,
    max_count: usize,
    threshold_amount: f64,
    window: Duration,
    lookup_timeout: Duration,
}

impl FrequentSmallTransactionsRule {
    pub const NAME: &'static str = "FrequentSmallTransactions";

    pub fn new(
        store: Arc<dyn TransactionStore>,
        max_count: usize,
        threshold_amount: f64,
        window: Duration,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            store,
            max_count,
            threshold_amount,
            window,
            lookup_timeout,
        }
    }
}

#[async_trait]
impl Rule for FrequentSmallTransactionsRule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn evaluate(&self, tx: &Transaction) -> Result<bool, StoreError> {
        if tx.amount >= self.threshold_amount {
            return Ok(false);
        }

        let filter = trailing_window(tx, self.window).amount_below(self.threshold_amount);
        let recent = query_with_timeout(self.store.as_ref(), &filter, self.lookup_timeout).await?;

        debug!(tx_id = %tx.id, user_id = %tx.user_id, count = recent.len(), "small transactions in window");
        Ok(recent.len() > self.max_count)
    }
}
