use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use txwatch_core::config::DatabaseConfig;
use txwatch_store::SqliteTransactionStore;

/// Open the SQLite database and make sure the transactions schema exists.
pub async fn init_store(config: &DatabaseConfig) -> anyhow::Result<Arc<SqliteTransactionStore>> {
    let store = SqliteTransactionStore::open(config)
        .await
        .with_context(|| format!("failed to open database at {}", config.filepath.display()))?;
    info!("Database schema ready");
    Ok(Arc::new(store))
}
