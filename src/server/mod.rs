//! Listening socket and the sequential accept loop.

pub mod listener;
pub mod stats;

pub use listener::{ServerContext, bind, run};
pub use stats::{ConnectionStats, StatsSnapshot};
