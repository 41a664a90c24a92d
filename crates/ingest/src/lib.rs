//! Validation, persistence and hand-off of newly submitted transactions.

pub mod error;
pub mod service;

pub use error::IngestError;
pub use service::IngestionService;
