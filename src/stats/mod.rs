//! Statistics module
//!
//! Lock-free run accounting using atomic operations.

mod atomic;

pub use atomic::{RunStats, RunStatsSnapshot};
