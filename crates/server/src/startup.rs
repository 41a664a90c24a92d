//! Service wiring, the HTTP server lifecycle and shutdown draining.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use txwatch_core::Config;
use txwatch_detection::DetectionManager;
use txwatch_ingest::IngestionService;
use txwatch_store::TransactionStore;

use crate::state::AppState;
use crate::{app_config, db, router};

/// Everything `serve` needs after wiring: handler state and the detection task.
pub struct Services {
    pub state: Arc<AppState>,
    pub detection: JoinHandle<()>,
}

/// Connect ingestion to a freshly spawned detection worker over a bounded queue.
pub fn build_services(config: &Config, store: Arc<dyn TransactionStore>) -> Services {
    let (sender, receiver) = mpsc::channel(config.detection.channel_capacity);

    let manager = DetectionManager::from_config(&config.detection, store.clone());
    let metrics = manager.metrics();
    let detection = manager.spawn(receiver);

    let state = Arc::new(AppState {
        store: store.clone(),
        ingestion: IngestionService::new(store, sender),
        detection: metrics,
    });

    Services { state, detection }
}

pub async fn serve(config: Config) -> anyhow::Result<()> {
    config.log_summary();

    let store = db::init_store(&config.database).await?;
    let Services { state, detection } = build_services(&config, store);
    let app = router::build_router(state, app_config::cors_layer(&config.server)?);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    finish(served, detection, config.detection.drain_timeout()).await
}

/// Drain detection after the HTTP server returns, then surface its result.
///
/// The router, and with it the last queue sender, is gone by now whether the
/// server stopped cleanly or failed.
async fn finish(served: std::io::Result<()>, detection: JoinHandle<()>, limit: Duration) -> anyhow::Result<()> {
    match &served {
        Ok(()) => info!("HTTP server stopped, draining detection queue"),
        Err(e) => error!(error = %e, "HTTP server failed, draining detection queue before exit"),
    }
    drain(detection, limit).await;
    served.context("HTTP server failed")
}

/// Wait up to `limit` for the detection worker to finish what is queued.
async fn drain(detection: JoinHandle<()>, limit: Duration) {
    match tokio::time::timeout(limit, detection).await {
        Ok(Ok(())) => info!("Detection queue drained"),
        Ok(Err(e)) => error!(error = %e, "Detection worker terminated abnormally"),
        Err(_) => warn!(?limit, "Drain timed out, queued transactions were not evaluated"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
