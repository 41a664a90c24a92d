//! Asynchronous rule-based suspicion detection.
//!
//! Newly persisted transactions arrive over a channel, every configured
//! [`Rule`] is evaluated against them, and a positive verdict is written back
//! through [`TransactionStore::mark_suspicious`](txwatch_store::TransactionStore::mark_suspicious).

pub mod error;
pub mod manager;
pub mod metrics;
pub mod rule;
pub mod rules;

pub use error::DetectionError;
pub use manager::{DetectionManager, DetectionOutcome};
pub use metrics::{DetectionMetrics, ManagerState, MetricsSnapshot};
pub use rule::Rule;
pub use rules::{build_rules, FrequentSmallTransactionsRule, HighVolumeRule, RapidTransfersRule};
pub use txwatch_core::config::EvaluationPolicy;
