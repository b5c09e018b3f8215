//! Lightweight atomic counters for the offline crackers.
//!
//! Plain `AtomicU64`/`AtomicUsize` fields behind a struct, not a
//! metrics-exporter crate: `rfcore-hardnested` and `rfcore-staticnested` run
//! for seconds to
//! minutes across a worker pool and need cheap, lock-free progress counters
//! the CLI can poll, not a push-based telemetry pipeline (out of scope per
//! `spec.md`'s Non-goals).

use std::sync::atomic::{AtomicU64, Ordering};

/// Shared, cheaply-clonable (via `&`) progress counters for a key-recovery run.
#[derive(Debug, Default)]
pub struct CrackMetrics {
    nonces_collected: AtomicU64,
    candidates_generated: AtomicU64,
    candidates_tested: AtomicU64,
    keys_found: AtomicU64,
}

impl CrackMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_nonce(&self) {
        self.nonces_collected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_candidates_generated(&self, n: u64) {
        self.candidates_generated.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_candidates_tested(&self, n: u64) {
        self.candidates_tested.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_key_found(&self) {
        self.keys_found.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> CrackMetricsSnapshot {
        CrackMetricsSnapshot {
            nonces_collected: self.nonces_collected.load(Ordering::Relaxed),
            candidates_generated: self.candidates_generated.load(Ordering::Relaxed),
            candidates_tested: self.candidates_tested.load(Ordering::Relaxed),
            keys_found: self.keys_found.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time, ordinary (non-atomic) copy of [`CrackMetrics`], suitable
/// for logging or display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CrackMetricsSnapshot {
    pub nonces_collected: u64,
    pub candidates_generated: u64,
    pub candidates_tested: u64,
    pub keys_found: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_across_calls() {
        let m = CrackMetrics::new();
        m.record_nonce();
        m.record_nonce();
        m.add_candidates_generated(100);
        m.add_candidates_tested(40);
        m.record_key_found();

        let snap = m.snapshot();
        assert_eq!(snap.nonces_collected, 2);
        assert_eq!(snap.candidates_generated, 100);
        assert_eq!(snap.candidates_tested, 40);
        assert_eq!(snap.keys_found, 1);
    }
}
