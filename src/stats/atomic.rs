//! Lock-free run accounting
//!
//! Tracks how many visitor sessions were launched and how each one ended,
//! without mutex contention between workers.

use std::sync::atomic::{AtomicU64, Ordering};

/// Completion accounting for one traffic run, shared by all visitors
#[derive(Debug, Default)]
pub struct RunStats {
    pub sessions_launched: AtomicU64,
    pub sessions_completed: AtomicU64,
    pub sessions_failed: AtomicU64,
    pub pages_visited: AtomicU64,
}

impl RunStats {
    /// Create new run stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a visitor being launched
    pub fn record_launched(&self) {
        self.sessions_launched.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a visitor that walked its whole page chain
    pub fn record_completed(&self, pages: u64) {
        self.sessions_completed.fetch_add(1, Ordering::Relaxed);
        self.pages_visited.fetch_add(pages, Ordering::Relaxed);
    }

    /// Record a visitor that ended on an unrecoverable session error
    pub fn record_failed(&self) {
        self.sessions_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get launched count
    pub fn launched(&self) -> u64 {
        self.sessions_launched.load(Ordering::Relaxed)
    }

    /// Get completed count
    pub fn completed(&self) -> u64 {
        self.sessions_completed.load(Ordering::Relaxed)
    }

    /// Get failed count
    pub fn failed(&self) -> u64 {
        self.sessions_failed.load(Ordering::Relaxed)
    }

    /// Get total pages visited across all completed visitors
    pub fn pages(&self) -> u64 {
        self.pages_visited.load(Ordering::Relaxed)
    }

    /// Get snapshot for serialization
    pub fn snapshot(&self) -> RunStatsSnapshot {
        RunStatsSnapshot {
            sessions_launched: self.launched(),
            sessions_completed: self.completed(),
            sessions_failed: self.failed(),
            pages_visited: self.pages(),
        }
    }
}

/// Serializable snapshot of run stats
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStatsSnapshot {
    pub sessions_launched: u64,
    pub sessions_completed: u64,
    pub sessions_failed: u64,
    pub pages_visited: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accounting_adds_up() {
        let stats = RunStats::new();
        for _ in 0..5 {
            stats.record_launched();
        }
        stats.record_completed(3);
        stats.record_completed(1);
        stats.record_failed();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.sessions_launched, 5);
        assert_eq!(snapshot.sessions_completed, 2);
        assert_eq!(snapshot.sessions_failed, 1);
        assert_eq!(snapshot.pages_visited, 4);
    }
}
