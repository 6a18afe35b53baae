use std::sync::atomic::{AtomicU64, Ordering};

use crate::http::connection::Outcome;

/// Connection lifecycle counters.
///
/// Every accepted connection is closed exactly once, so once the loop is
/// idle `accepted == closed` and `closed` equals the sum of the outcomes.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    accepted: AtomicU64,
    closed: AtomicU64,
    served: AtomicU64,
    rejected: AtomicU64,
    send_failed: AtomicU64,
    errored: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub accepted: u64,
    pub closed: u64,
    pub served: u64,
    pub rejected: u64,
    pub send_failed: u64,
    pub errored: u64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a finished connection along with how it ended.
    pub fn record_closed(&self, result: &anyhow::Result<Outcome>) {
        let counter = match result {
            Ok(Outcome::Served) => &self.served,
            Ok(Outcome::Rejected) => &self.rejected,
            Ok(Outcome::SendFailed) => &self.send_failed,
            Err(_) => &self.errored,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.closed.fetch_add(1, Ordering::Release);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            closed: self.closed.load(Ordering::Acquire),
            accepted: self.accepted.load(Ordering::Relaxed),
            served: self.served.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            send_failed: self.send_failed.load(Ordering::Relaxed),
            errored: self.errored.load(Ordering::Relaxed),
        }
    }
}
