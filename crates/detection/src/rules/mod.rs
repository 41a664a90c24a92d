//! The built-in rule set.
//!
//! Evaluation order is fixed: high volume, frequent small, rapid transfers.
//! Disabled rules are left out of the set entirely.

mod frequent_small;
mod high_volume;
mod rapid_transfers;

use std::sync::Arc;

use chrono::TimeDelta;

use txwatch_core::config::DetectionConfig;
use txwatch_core::{Filter, Transaction};
use txwatch_store::TransactionStore;

use crate::rule::Rule;

pub use frequent_small::FrequentSmallTransactionsRule;
pub use high_volume::HighVolumeRule;
pub use rapid_transfers::RapidTransfersRule;

/// Build the configured rules in evaluation order.
pub fn build_rules(config: &DetectionConfig, store: Arc<dyn TransactionStore>) -> Vec<Box<dyn Rule>> {
    let lookup_timeout = config.lookup_timeout();
    let mut rules: Vec<Box<dyn Rule>> = Vec::with_capacity(3);

    if config.high_volume.enabled {
        rules.push(Box::new(HighVolumeRule::new(config.high_volume.threshold)));
    }
    if config.frequent_small.enabled {
        rules.push(Box::new(FrequentSmallTransactionsRule::new(
            store.clone(),
            config.frequent_small.max_count,
            config.frequent_small.threshold_amount,
            config.frequent_small.window(),
            lookup_timeout,
        )));
    }
    if config.rapid_transfers.enabled {
        rules.push(Box::new(RapidTransfersRule::new(
            store,
            config.rapid_transfers.min_consecutive,
            config.rapid_transfers.window(),
            lookup_timeout,
        )));
    }
    rules
}

/// The same user's history over the trailing window ending at `tx.timestamp`.
///
/// A window too large to subtract leaves the lower bound open.
pub(crate) fn trailing_window(tx: &Transaction, window: std::time::Duration) -> Filter {
    let filter = Filter::new().user(tx.user_id.clone()).until(tx.timestamp);
    match TimeDelta::from_std(window)
        .ok()
        .and_then(|w| tx.timestamp.checked_sub_signed(w))
    {
        Some(since) => filter.since(since),
        None => filter,
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use txwatch_core::TransactionType;

    #[tokio::test]
    async fn build_rules_keeps_fixed_order_and_skips_disabled() {
        let store: Arc<dyn TransactionStore> = store_with(&[]).await;
        let mut config = DetectionConfig::default();

        let names: Vec<_> = build_rules(&config, store.clone()).iter().map(|r| r.name()).collect();
        assert_eq!(
            names,
            vec!["HighVolumeTransaction", "FrequentSmallTransactions", "RapidTransfers"]
        );

        config.frequent_small.enabled = false;
        let names: Vec<_> = build_rules(&config, store).iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["HighVolumeTransaction", "RapidTransfers"]);
    }

    #[test]
    fn trailing_window_ends_at_transaction() {
        let t = tx("tx_1", "u1", 1.0, TransactionType::Deposit, 600);
        let filter = trailing_window(&t, std::time::Duration::from_secs(60));
        assert_eq!(filter.user_id.as_deref(), Some("u1"));
        assert_eq!(filter.since, Some(at(540)));
        assert_eq!(filter.until, Some(at(600)));

        let open = trailing_window(&t, std::time::Duration::MAX);
        assert_eq!(open.since, None);
    }
}
