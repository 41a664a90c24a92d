use std::sync::Arc;

use txwatch_detection::DetectionMetrics;
use txwatch_ingest::IngestionService;
use txwatch_store::TransactionStore;

/// Shared handler state.
///
/// `ingestion` owns the only sender into the detection queue, so dropping the
/// last `AppState` is what lets the detection worker drain and stop.
pub struct AppState {
    pub store: Arc<dyn TransactionStore>,
    pub ingestion: IngestionService,
    pub detection: Arc<DetectionMetrics>,
}
