//! Transaction identity and server-side timestamps.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Namespace tag prepended to every generated transaction ID.
pub const TRANSACTION_ID_PREFIX: &str = "tx_";

/// Generate a fresh, globally unique transaction ID (`tx_<uuid-v4>`).
pub fn new_transaction_id() -> String {
    format!("{}{}", TRANSACTION_ID_PREFIX, Uuid::new_v4())
}

/// UTC clock with microsecond resolution that never goes backwards within a process.
///
/// Microseconds match the store's timestamp precision, so an instant handed out
/// here round-trips through persistence unchanged. If the wall clock stalls or
/// steps back, the next reading is bumped one microsecond past the previous one.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last_micros: AtomicI64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> DateTime<Utc> {
        let wall = Utc::now().timestamp_micros();
        let mut prev = self.last_micros.load(Ordering::Relaxed);
        loop {
            let next = wall.max(prev + 1);
            match self
                .last_micros
                .compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return DateTime::from_timestamp_micros(next).unwrap_or_else(Utc::now),
                Err(actual) => prev = actual,
            }
        }
    }
}
