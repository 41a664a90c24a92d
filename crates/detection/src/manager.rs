//! The detection loop.
//!
//! One [`DetectionManager`] consumes the ingestion channel for the life of the
//! process. Failures on this path never reach a caller: each one ends as a
//! [`DetectionOutcome`] that is logged and counted in [`DetectionMetrics`].

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use txwatch_core::config::{DetectionConfig, EvaluationPolicy};
use txwatch_core::{SuspicionVerdict, Transaction};
use txwatch_store::{StoreError, TransactionStore};

use crate::error::DetectionError;
use crate::metrics::DetectionMetrics;
use crate::rule::Rule;
use crate::rules::build_rules;


/// Terminal result of one detection pass.
#[derive(Debug)]
pub enum DetectionOutcome {
    /// No rule fired; the stored record was not touched.
    Clean,
    /// At least one rule fired and the verdict was persisted.
    Flagged(Vec<String>),
    /// Aggregation failed under [`EvaluationPolicy::FailFast`]. The transaction
    /// is not retried and keeps its creation-time suspicion fields.
    Dropped(DetectionError),
    /// Rules fired but `mark_suspicious` failed, so the stored flag is stale.
    PersistFailed {
        flagged_rules: Vec<String>,
        error: StoreError,
    },
}

pub struct DetectionManager {
    rules: Vec<Box<dyn Rule>>,
    store: Arc<dyn TransactionStore>,
    policy: EvaluationPolicy,
    metrics: Arc<DetectionMetrics>,
}

impl DetectionManager {
    pub fn new(rules: Vec<Box<dyn Rule>>, store: Arc<dyn TransactionStore>, policy: EvaluationPolicy) -> Self {
        Self {
            rules,
            store,
            policy,
            metrics: Arc::new(DetectionMetrics::new()),
        }
    }

    /// Manager with the built-in rule set configured from `config`.
    pub fn from_config(config: &DetectionConfig, store: Arc<dyn TransactionStore>) -> Self {
        Self::new(build_rules(config, store.clone()), store, config.policy)
    }

    pub fn metrics(&self) -> Arc<DetectionMetrics> {
        self.metrics.clone()
    }

    pub fn policy(&self) -> EvaluationPolicy {
        self.policy
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Run every rule against `tx` in order and collect the names of those that fired.
    ///
    /// Under `FailFast` the first rule error aborts the pass: later rules are
    /// not evaluated and flags collected so far are discarded. Under
    /// `BestEffort` a failing rule is logged and skipped.
    pub async fn evaluate_all(&self, tx: &Transaction) -> Result<SuspicionVerdict, DetectionError> {
        let mut verdict = SuspicionVerdict::clean();

        for rule in &self.rules {
            match rule.evaluate(tx).await {
                Ok(true) => verdict.flag(rule.name()),
                Ok(false) => {}
                Err(source) => match self.policy {
                    EvaluationPolicy::FailFast => return Err(DetectionError::new(rule.name(), source)),
                    EvaluationPolicy::BestEffort => {
                        warn!(tx_id = %tx.id, rule = rule.name(), error = %source, "Rule failed, skipping");
                    }
                },
            }
        }

        Ok(verdict)
    }

    /// One full detection pass for `tx`, including the write-back.
    pub async fn process(&self, tx: &Transaction) -> DetectionOutcome {
        let verdict = match self.evaluate_all(tx).await {
            Ok(verdict) => verdict,
            Err(e) => {
                error!(tx_id = %tx.id, user_id = %tx.user_id, rule = e.rule, error = %e.source, "Detection pass failed, transaction dropped");
                self.metrics.record_dropped();
                return DetectionOutcome::Dropped(e);
            }
        };

        if !verdict.suspicious {
            debug!(tx_id = %tx.id, "Transaction clean");
            self.metrics.record_clean();
            return DetectionOutcome::Clean;
        }

        match self.store.mark_suspicious(&tx.id, true, &verdict.flagged_rules).await {
            Ok(()) => {
                info!(tx_id = %tx.id, user_id = %tx.user_id, rules = ?verdict.flagged_rules, "Transaction flagged");
                self.metrics.record_flagged();
                DetectionOutcome::Flagged(verdict.flagged_rules)
            }
            Err(error) => {
                error!(tx_id = %tx.id, rules = ?verdict.flagged_rules, error = %error, "Failed to persist suspicion verdict");
                self.metrics.record_persist_failure();
                DetectionOutcome::PersistFailed {
                    flagged_rules: verdict.flagged_rules,
                    error,
                }
            }
        }
    }

    /// Process transactions until every sender is dropped and the queue is empty.
    pub async fn run(self, mut receiver: mpsc::Receiver<Transaction>) {
        self.metrics.set_running(true);
        info!(rules = ?self.rule_names(), policy = %self.policy, "Detection manager started");

        while let Some(tx) = receiver.recv().await {
            self.process(&tx).await;
        }

        self.metrics.set_running(false);
        info!("Detection channel closed, manager stopped");
    }

    /// Run the loop on a background task.
    pub fn spawn(self, receiver: mpsc::Receiver<Transaction>) -> JoinHandle<()> {
        self.metrics.set_running(true);
        tokio::spawn(self.run(receiver))
    }
}
