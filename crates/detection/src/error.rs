use thiserror::Error;

use txwatch_store::StoreError;

/// A rule could not reach a verdict for one transaction.
#[derive(Debug, Error)]
#[error("rule {rule} failed: {source}")]
pub struct DetectionError {
    pub rule: &'static str,
    pub source: StoreError,
}

impl DetectionError {
    pub fn new(rule: &'static str, source: StoreError) -> Self {
        Self { rule, source }
    }
}
