mod api;
mod app_config;
mod cli;
mod db;
mod router;
mod startup;
mod state;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    // .env may carry TXWATCH_CONFIG, so it has to be loaded before argument parsing.
    txwatch_core::config::load_dotenv();
    let cli = Cli::parse();
    let config = app_config::load_config(&cli)?;

    match cli.command() {
        Command::Serve => startup::serve(config).await,
        Command::Migrate => {
            db::init_store(&config.database).await?;
            info!(file = %config.database.filepath.display(), "Schema initialized, exiting");
            Ok(())
        }
    }
}
