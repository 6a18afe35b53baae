//! Wall-clock time source.
//!
//! Clock synchronization happens outside this crate; the server only needs
//! "now" and a fixed textual format for it.

use chrono::{DateTime, Utc};

/// Format used for response timestamps, e.g. `2024-01-01T00:00:05Z`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The host's system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub fn format_timestamp(time: &DateTime<Utc>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}
