use chrono::{DateTime, Duration, TimeZone, Utc};

use txwatch_core::config::DatabaseConfig;
use txwatch_core::{Filter, Transaction, TransactionType};

use super::*;

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
}

fn tx(id: &str, user: &str, amount: f64, kind: TransactionType, minute: i64) -> Transaction {
    Transaction::new(id, user, amount, kind, base_time() + Duration::minutes(minute))
}

fn ids(txs: &[Transaction]) -> Vec<&str> {
    txs.iter().map(|t| t.id.as_str()).collect()
}

/// Four rows across two users, inserted out of timestamp order.
async fn seeded_store() -> SqliteTransactionStore {
    let store = SqliteTransactionStore::in_memory().await.unwrap();
    let rows = [
        tx("tx_a", "u1", 50.0, TransactionType::Deposit, 1),
        tx("tx_c", "u1", 500.0, TransactionType::Transfer, 3),
        tx("tx_b", "u2", 20.0, TransactionType::Deposit, 2),
        tx("tx_d", "u1", 5.0, TransactionType::Deposit, 4),
    ];
    for row in &rows {
        store.append(row).await.unwrap();
    }
    store
        .mark_suspicious("tx_c", true, &["RapidTransfers".to_string()])
        .await
        .unwrap();
    store
}

#[tokio::test]
async fn query_without_filter_returns_all_newest_first() {
    let store = seeded_store().await;
    let all = store.query(&Filter::new()).await.unwrap();
    assert_eq!(ids(&all), vec!["tx_d", "tx_c", "tx_b", "tx_a"]);
    for pair in all.windows(2) {
        assert!(pair[0].timestamp > pair[1].timestamp);
    }
}

#[tokio::test]
async fn query_filters_compose_conjunctively() {
    let store = seeded_store().await;

    let by_user_type = store
        .query(&Filter::new().user("u1").of_type(TransactionType::Deposit))
        .await
        .unwrap();
    assert_eq!(ids(&by_user_type), vec!["tx_d", "tx_a"]);

    let suspicious = store.query(&Filter::new().user("u1").suspicious(true)).await.unwrap();
    assert_eq!(ids(&suspicious), vec!["tx_c"]);
    assert_eq!(suspicious[0].flagged_rules, vec!["RapidTransfers"]);

    let clean = store.query(&Filter::new().suspicious(false)).await.unwrap();
    assert_eq!(ids(&clean), vec!["tx_d", "tx_b", "tx_a"]);

    // amount bound is strict
    let small = store.query(&Filter::new().amount_below(50.0)).await.unwrap();
    assert_eq!(ids(&small), vec!["tx_d", "tx_b"]);

    // since is inclusive
    let recent = store
        .query(&Filter::new().since(base_time() + Duration::minutes(3)))
        .await
        .unwrap();
    assert_eq!(ids(&recent), vec!["tx_d", "tx_c"]);

    let none = store.query(&Filter::new().user("nobody")).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn until_bound_is_inclusive() {
    let store = seeded_store().await;
    let window = store
        .query(
            &Filter::new()
                .user("u1")
                .since(base_time() + Duration::minutes(1))
                .until(base_time() + Duration::minutes(3)),
        )
        .await
        .unwrap();
    assert_eq!(ids(&window), vec!["tx_c", "tx_a"]);
}

#[tokio::test]
async fn equal_timestamps_order_by_insertion_newest_first() {
    let store = SqliteTransactionStore::in_memory().await.unwrap();
    store.append(&tx("tx_first", "u1", 1.0, TransactionType::Deposit, 0)).await.unwrap();
    store.append(&tx("tx_second", "u1", 1.0, TransactionType::Deposit, 0)).await.unwrap();

    let all = store.query(&Filter::new()).await.unwrap();
    assert_eq!(ids(&all), vec!["tx_second", "tx_first"]);
}

#[tokio::test]
async fn mark_suspicious_overwrites_flags() {
    let store = seeded_store().await;
    store
        .mark_suspicious("tx_a", true, &["A".to_string(), "B".to_string()])
        .await
        .unwrap();
    store
        .mark_suspicious("tx_a", true, &["C".to_string()])
        .await
        .unwrap();

    let row = store.get("tx_a").await.unwrap().unwrap();
    assert!(row.is_suspicious);
    assert_eq!(row.flagged_rules, vec!["C"]);

    store.mark_suspicious("tx_a", false, &[]).await.unwrap();
    let row = store.get("tx_a").await.unwrap().unwrap();
    assert!(!row.is_suspicious);
    assert!(row.flagged_rules.is_empty());
}

#[tokio::test]
async fn mark_suspicious_unknown_id_is_not_found() {
    let store = seeded_store().await;
    let err = store
        .mark_suspicious("tx_missing", true, &["HighVolumeTransaction".to_string()])
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("tx_missing"));
}

#[tokio::test]
async fn duplicate_append_leaves_original_untouched() {
    let store = seeded_store().await;
    let original = store.get("tx_a").await.unwrap().unwrap();

    let clash = tx("tx_a", "someone-else", 9999.0, TransactionType::Withdrawal, 30);
    let err = store.append(&clash).await.unwrap_err();
    assert!(err.is_duplicate());

    assert_eq!(store.get("tx_a").await.unwrap(), Some(original));
    assert_eq!(store.query(&Filter::new()).await.unwrap().len(), 4);
}

#[tokio::test]
async fn get_round_trips_every_field() {
    let store = SqliteTransactionStore::in_memory().await.unwrap();
    let ts = base_time() + Duration::microseconds(123_456);
    let mut written = Transaction::new("tx_x", "u9", -12.75, TransactionType::Withdrawal, ts);
    written.is_suspicious = true;
    written.flagged_rules = vec!["HighVolumeTransaction".into(), "RapidTransfers".into()];
    store.append(&written).await.unwrap();

    assert_eq!(store.get("tx_x").await.unwrap(), Some(written));
    assert_eq!(store.get("tx_nope").await.unwrap(), None);
}

#[tokio::test]
async fn schema_init_is_idempotent_on_file_database() {
    let dir = tempfile::tempdir().unwrap();
    let config = DatabaseConfig {
        filepath: dir.path().join("nested").join("tx.db"),
        ..DatabaseConfig::default()
    };

    let store = SqliteTransactionStore::open(&config).await.unwrap();
    store.append(&tx("tx_1", "u1", 1.0, TransactionType::Deposit, 0)).await.unwrap();
    store.initialize_schema().await.unwrap();
    store.initialize_schema().await.unwrap();
    store.pool().close().await;

    let reopened = SqliteTransactionStore::open(&config).await.unwrap();
    let rows = reopened.query(&Filter::new()).await.unwrap();
    assert_eq!(ids(&rows), vec!["tx_1"]);
}

#[tokio::test]
async fn corrupt_type_surfaces_as_corrupt_error() {
    let store = SqliteTransactionStore::in_memory().await.unwrap();
    sqlx::query(
        "INSERT INTO transactions (id, user_id, amount, type, timestamp) VALUES ('tx_bad', 'u1', 1.0, 'refund', 0)",
    )
    .execute(store.pool())
    .await
    .unwrap();

    let err = store.get("tx_bad").await.unwrap_err();
    assert!(matches!(err, StoreError::Corrupt { ref id, .. } if id == "tx_bad"));
}

#[test]
fn rule_list_encoding() {
    assert_eq!(join_rules(&[]), "");
    assert!(split_rules("").is_empty());
    assert_eq!(
        split_rules(&join_rules(&["A".to_string(), "B".to_string()])),
        vec!["A", "B"]
    );
}
