pub mod clock;
pub mod config;
pub mod error;
pub mod transaction;

pub use clock::{new_transaction_id, MonotonicClock};
pub use config::Config;
pub use error::*;
pub use transaction::*;
