//! Transaction records, the raw ingestion payload, and the query filter.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ParseTransactionTypeError;

// ── Transaction type ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Transfer,
}

impl TransactionType {
    pub const ALL: [TransactionType; 3] = [Self::Deposit, Self::Withdrawal, Self::Transfer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::Transfer => "transfer",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = ParseTransactionTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(Self::Deposit),
            "withdrawal" => Ok(Self::Withdrawal),
            "transfer" => Ok(Self::Transfer),
            other => Err(ParseTransactionTypeError(other.to_string())),
        }
    }
}

// ── Transaction ───────────────────────────────────────────────

/// A persisted transaction.
///
/// `id` and `timestamp` are assigned at ingestion. The suspicion fields start
/// as `false` / empty and are overwritten by the detection pass when a rule fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub user_id: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_suspicious: bool,
    #[serde(default)]
    pub flagged_rules: Vec<String>,
}

impl Transaction {
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        amount: f64,
        transaction_type: TransactionType,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            amount,
            transaction_type,
            timestamp,
            is_suspicious: false,
            flagged_rules: Vec::new(),
        }
    }
}

/// Client-submitted payload for a new transaction.
///
/// Everything is optional at the wire level so that missing fields surface as
/// validation errors from the ingestion service rather than as decode failures.
/// Any `id` or `timestamp` the client sends is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    #[serde(default, alias = "user_id")]
    pub user_id: String,
    #[serde(default)]
    pub amount: f64,
    #[serde(default, rename = "type")]
    pub transaction_type: String,
}

impl NewTransaction {
    pub fn new(user_id: impl Into<String>, amount: f64, transaction_type: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            amount,
            transaction_type: transaction_type.into(),
        }
    }
}

// ── Suspicion verdict ─────────────────────────────────────────

/// Outcome of one detection pass: suspicious if any rule fired, with the
/// names of the rules that fired in evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SuspicionVerdict {
    pub suspicious: bool,
    pub flagged_rules: Vec<String>,
}

impl SuspicionVerdict {
    pub fn clean() -> Self {
        Self::default()
    }

    pub fn flag(&mut self, rule: impl Into<String>) {
        self.suspicious = true;
        self.flagged_rules.push(rule.into());
    }
}

// ── Filter ────────────────────────────────────────────────────

/// Conjunctive query predicate over stored transactions.
///
/// Unset fields match everything. `amount_less_than` is strict,
/// `since` and `until` are inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub user_id: Option<String>,
    pub is_suspicious: Option<bool>,
    pub transaction_type: Option<TransactionType>,
    pub amount_less_than: Option<f64>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn suspicious(mut self, suspicious: bool) -> Self {
        self.is_suspicious = Some(suspicious);
        self
    }

    pub fn of_type(mut self, transaction_type: TransactionType) -> Self {
        self.transaction_type = Some(transaction_type);
        self
    }

    pub fn amount_below(mut self, amount: f64) -> Self {
        self.amount_less_than = Some(amount);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    /// Whether `tx` satisfies every set predicate.
    pub fn matches(&self, tx: &Transaction) -> bool {
        self.user_id.as_ref().map_or(true, |u| &tx.user_id == u)
            && self.is_suspicious.map_or(true, |s| tx.is_suspicious == s)
            && self.transaction_type.map_or(true, |t| tx.transaction_type == t)
            && self.amount_less_than.map_or(true, |a| tx.amount < a)
            && self.since.map_or(true, |s| tx.timestamp >= s)
            && self.until.map_or(true, |u| tx.timestamp <= u)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn sample() -> Transaction {
        Transaction::new(
            "tx_1",
            "u1",
            42.5,
            TransactionType::Deposit,
            Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        )
    }

    #[test]
    fn transaction_type_parses_known_values_only() {
        for t in TransactionType::ALL {
            assert_eq!(t.as_str().parse::<TransactionType>(), Ok(t));
        }
        let err = "Deposit".parse::<TransactionType>().unwrap_err();
        assert!(err.to_string().contains("'Deposit'"));
        assert!("".parse::<TransactionType>().is_err());
    }

    #[test]
    fn transaction_serializes_camel_case() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["type"], "deposit");
        assert_eq!(json["isSuspicious"], false);
        assert_eq!(json["flaggedRules"], serde_json::json!([]));
        assert!(json["timestamp"].as_str().unwrap().starts_with("2025-03-01T12:00:00"));
    }

    #[test]
    fn new_transaction_tolerates_missing_fields_and_ignores_server_fields() {
        let raw: NewTransaction = serde_json::from_str(
            r#"{"id":"client-id","userId":"u1","amount":15000,"timestamp":"2020-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(raw.user_id, "u1");
        assert_eq!(raw.amount, 15000.0);
        assert!(raw.transaction_type.is_empty());

        let snake: NewTransaction =
            serde_json::from_str(r#"{"user_id":"u2","amount":1,"type":"transfer"}"#).unwrap();
        assert_eq!(snake.user_id, "u2");
        assert_eq!(snake.transaction_type, "transfer");
    }

    #[test]
    fn verdict_collects_rules_in_order() {
        let mut verdict = SuspicionVerdict::clean();
        assert!(!verdict.suspicious);
        verdict.flag("A");
        verdict.flag("B");
        verdict.flag("A");
        assert!(verdict.suspicious);
        assert_eq!(verdict.flagged_rules, vec!["A", "B", "A"]);
    }

    #[test]
    fn filter_matches_conjunctively() {
        let tx = sample();
        assert!(Filter::new().matches(&tx));
        assert!(Filter::new().user("u1").of_type(TransactionType::Deposit).matches(&tx));
        assert!(!Filter::new().user("u1").of_type(TransactionType::Transfer).matches(&tx));
        assert!(!Filter::new().amount_below(42.5).matches(&tx));
        assert!(Filter::new().amount_below(42.6).matches(&tx));
        assert!(Filter::new().since(tx.timestamp).until(tx.timestamp).matches(&tx));
        assert!(!Filter::new().since(tx.timestamp + Duration::microseconds(1)).matches(&tx));
        assert!(!Filter::new().suspicious(true).matches(&tx));
    }
}
