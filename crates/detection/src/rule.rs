use async_trait::async_trait;

use txwatch_core::Transaction;
use txwatch_store::StoreError;

/// A single suspicion predicate.
///
/// Rules hold their thresholds as plain fields and, when they need history,
/// a shared handle to the store. A rule never mutates the store.
#[async_trait]
pub trait Rule: Send + Sync {
    /// Name recorded in a transaction's flagged rules when this rule fires.
    fn name(&self) -> &'static str;

    /// Whether `tx` trips this rule. Store failures propagate unchanged.
    async fn evaluate(&self, tx: &Transaction) -> Result<bool, StoreError>;
}
