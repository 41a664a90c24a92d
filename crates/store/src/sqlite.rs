//! SQLite-backed [`TransactionStore`] over an sqlx connection pool.
//!
//! Timestamps are stored as integer microseconds since the Unix epoch so that
//! ordering and window comparisons are plain integer comparisons. Flagged rule
//! names are stored comma-joined; rule names must not contain a comma.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, info};

use txwatch_core::config::DatabaseConfig;
use txwatch_core::{Filter, Transaction};

use crate::{StoreError, TransactionStore};

#[cfg(test)]
mod tests;

const RULE_DELIMITER: &str = ",";

const SELECT_TRANSACTIONS: &str =
    "SELECT id, user_id, amount, type, timestamp, is_suspicious, flagged_rules FROM transactions";

const CREATE_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS transactions (
        id            TEXT PRIMARY KEY,
        user_id       TEXT NOT NULL,
        amount        REAL NOT NULL,
        type          TEXT NOT NULL,
        timestamp     INTEGER NOT NULL,
        is_suspicious INTEGER NOT NULL DEFAULT 0,
        flagged_rules TEXT NOT NULL DEFAULT ''
    )";

const CREATE_INDEXES: [&str; 2] = [
    "CREATE INDEX IF NOT EXISTS idx_transactions_user_timestamp ON transactions (user_id, timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_transactions_is_suspicious ON transactions (is_suspicious)",
];

// ── Pool ──────────────────────────────────────────────────────

/// Open an SQLite pool sized and tuned from `config`.
///
/// File databases run in WAL mode and have their parent directory created.
/// `:memory:` databases are pinned to a single never-recycled connection,
/// since every SQLite connection would otherwise see its own empty database.
pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool, StoreError> {
    let pool = if config.is_in_memory() {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.busy_timeout(config.busy_timeout());
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await?
    } else {
        if let Some(parent) = config.filepath.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(sqlx::Error::Io)?;
            }
        }
        let options = SqliteConnectOptions::new()
            .filename(&config.filepath)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(config.busy_timeout());
        SqlitePoolOptions::new()
            .max_connections(config.max_open_conns)
            .min_connections(config.max_idle_conns)
            .max_lifetime(config.conn_max_lifetime())
            .connect_with(options)
            .await?
    };

    info!(
        file = %config.filepath.display(),
        max_open_conns = config.max_open_conns,
        "SQLite pool ready"
    );
    Ok(pool)
}

// ── Row mapping ───────────────────────────────────────────────

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: String,
    user_id: String,
    amount: f64,
    #[sqlx(rename = "type")]
    transaction_type: String,
    timestamp: i64,
    is_suspicious: bool,
    flagged_rules: String,
}

impl TransactionRow {
    fn into_transaction(self) -> Result<Transaction, StoreError> {
        let transaction_type = self.transaction_type.parse().map_err(|e| StoreError::Corrupt {
            id: self.id.clone(),
            reason: format!("{}", e),
        })?;
        let timestamp = DateTime::from_timestamp_micros(self.timestamp).ok_or_else(|| StoreError::Corrupt {
            id: self.id.clone(),
            reason: format!("timestamp {} out of range", self.timestamp),
        })?;
        Ok(Transaction {
            id: self.id,
            user_id: self.user_id,
            amount: self.amount,
            transaction_type,
            timestamp,
            is_suspicious: self.is_suspicious,
            flagged_rules: split_rules(&self.flagged_rules),
        })
    }
}

fn join_rules(rules: &[String]) -> String {
    rules.join(RULE_DELIMITER)
}

fn split_rules(encoded: &str) -> Vec<String> {
    if encoded.is_empty() {
        return Vec::new();
    }
    encoded.split(RULE_DELIMITER).map(str::to_string).collect()
}

fn push_condition(qb: &mut QueryBuilder<'static, Sqlite>, conditions: &mut usize, sql: &str) {
    qb.push(if *conditions == 0 { " WHERE " } else { " AND " });
    qb.push(sql);
    *conditions += 1;
}

/// Translate a [`Filter`] into a parameterised SELECT, newest first.
fn build_query(filter: &Filter) -> QueryBuilder<'static, Sqlite> {
    let mut qb = QueryBuilder::new(SELECT_TRANSACTIONS);
    let mut n = 0;

    if let Some(user_id) = &filter.user_id {
        push_condition(&mut qb, &mut n, "user_id = ");
        qb.push_bind(user_id.clone());
    }
    if let Some(suspicious) = filter.is_suspicious {
        push_condition(&mut qb, &mut n, "is_suspicious = ");
        qb.push_bind(suspicious);
    }
    if let Some(transaction_type) = filter.transaction_type {
        push_condition(&mut qb, &mut n, "type = ");
        qb.push_bind(transaction_type.as_str());
    }
    if let Some(amount) = filter.amount_less_than {
        push_condition(&mut qb, &mut n, "amount < ");
        qb.push_bind(amount);
    }
    if let Some(since) = filter.since {
        push_condition(&mut qb, &mut n, "timestamp >= ");
        qb.push_bind(since.timestamp_micros());
    }
    if let Some(until) = filter.until {
        push_condition(&mut qb, &mut n, "timestamp <= ");
        qb.push_bind(until.timestamp_micros());
    }

    // Equal timestamps fall back to insertion order, newest first.
    qb.push(" ORDER BY timestamp DESC, rowid DESC");
    qb
}

// ── Store ─────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SqliteTransactionStore {
    pool: SqlitePool,
}

impl SqliteTransactionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect using `config` and make sure the schema exists.
    pub async fn open(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let store = Self::new(connect(config).await?);
        store.initialize_schema().await?;
        Ok(store)
    }

    /// A fresh, initialised in-memory store.
    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::open(&DatabaseConfig::in_memory()).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl TransactionStore for SqliteTransactionStore {
    async fn initialize_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        for statement in CREATE_INDEXES {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!("Transaction schema initialized");
        Ok(())
    }

    async fn append(&self, tx: &Transaction) -> Result<(), StoreError> {
        let result = sqlx::query(
            "INSERT INTO transactions (id, user_id, amount, type, timestamp, is_suspicious, flagged_rules)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&tx.id)
        .bind(&tx.user_id)
        .bind(tx.amount)
        .bind(tx.transaction_type.as_str())
        .bind(tx.timestamp.timestamp_micros())
        .bind(tx.is_suspicious)
        .bind(join_rules(&tx.flagged_rules))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::Duplicate(tx.id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn query(&self, filter: &Filter) -> Result<Vec<Transaction>, StoreError> {
        let mut qb = build_query(filter);
        let rows = qb
            .build_query_as::<TransactionRow>()
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(TransactionRow::into_transaction).collect()
    }

    async fn mark_suspicious(
        &self,
        id: &str,
        suspicious: bool,
        flagged_rules: &[String],
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE transactions SET is_suspicious = ?, flagged_rules = ? WHERE id = ?")
            .bind(suspicious)
            .bind(join_rules(flagged_rules))
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Transaction>, StoreError> {
        let sql = format!("{} WHERE id = ?", SELECT_TRANSACTIONS);
        sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(TransactionRow::into_transaction)
            .transpose()
    }
}
