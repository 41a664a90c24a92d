use async_trait::async_trait;

use txwatch_core::Transaction;
use txwatch_store::StoreError;

use crate::rule::Rule;

/// Fires on any single transaction strictly above `threshold`.
#[derive(Debug, Clone)]
pub struct HighVolumeRule {
    threshold: f64,
}

impl HighVolumeRule {
    pub const NAME: &'static str = "HighVolumeTransaction";

    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

#[async_trait]
impl Rule for HighVolumeRule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn evaluate(&self, tx: &Transaction) -> Result<bool, StoreError> {
        Ok(tx.amount > self.threshold)
    }
}
