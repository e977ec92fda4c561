//! Mirror metrics
//!
//! - Counters only, monotonic
//! - Lock-free atomics with Relaxed ordering

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Per-mirror operational counters
#[derive(Debug, Default)]
pub struct MirrorMetrics {
    /// Successful initializations
    initializations: AtomicU64,
    /// Failed initial fetches
    fetch_failures: AtomicU64,
    /// Change events applied
    events_applied: AtomicU64,
    /// Change events skipped as already reflected by the fetch
    events_stale: AtomicU64,
    /// Change events received while not live
    events_ignored: AtomicU64,
    /// Rows or events that failed to decode
    decode_failures: AtomicU64,
    /// Snapshots handed to the change callback
    snapshots_emitted: AtomicU64,
    /// Mutations sent to the remote
    mutations_submitted: AtomicU64,
    /// Mutations that failed
    mutations_rejected: AtomicU64,
}

macro_rules! counter {
    ($inc:ident, $get:ident, $field:ident) => {
        #[doc = concat!("Increment `", stringify!($field), "`")]
        pub fn $inc(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
        }

        #[doc = concat!("Current `", stringify!($field), "`")]
        pub fn $get(&self) -> u64 {
            self.$field.load(Ordering::Relaxed)
        }
    };
}

impl MirrorMetrics {
    /// Create a registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    counter!(increment_initializations, initializations, initializations);
    counter!(increment_fetch_failures, fetch_failures, fetch_failures);
    counter!(increment_events_applied, events_applied, events_applied);
    counter!(increment_events_stale, events_stale, events_stale);
    counter!(increment_events_ignored, events_ignored, events_ignored);
    counter!(increment_decode_failures, decode_failures, decode_failures);
    counter!(increment_snapshots_emitted, snapshots_emitted, snapshots_emitted);
    counter!(increment_mutations_submitted, mutations_submitted, mutations_submitted);
    counter!(increment_mutations_rejected, mutations_rejected, mutations_rejected);

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MirrorMetricsSnapshot {
        MirrorMetricsSnapshot {
            initializations: self.initializations(),
            fetch_failures: self.fetch_failures(),
            events_applied: self.events_applied(),
            events_stale: self.events_stale(),
            events_ignored: self.events_ignored(),
            decode_failures: self.decode_failures(),
            snapshots_emitted: self.snapshots_emitted(),
            mutations_submitted: self.mutations_submitted(),
            mutations_rejected: self.mutations_rejected(),
        }
    }
}

/// A point-in-time copy of all counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MirrorMetricsSnapshot {
    pub initializations: u64,
    pub fetch_failures: u64,
    pub events_applied: u64,
    pub events_stale: u64,
    pub events_ignored: u64,
    pub decode_failures: u64,
    pub snapshots_emitted: u64,
    pub mutations_submitted: u64,
    pub mutations_rejected: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_has_zero_values() {
        assert_eq!(MirrorMetrics::new().snapshot(), MirrorMetricsSnapshot::default());
    }

    #[test]
    fn test_increment_counters() {
        let metrics = MirrorMetrics::new();
        metrics.increment_events_applied();
        metrics.increment_events_applied();
        metrics.increment_decode_failures();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.events_applied, 2);
        assert_eq!(snapshot.decode_failures, 1);
        assert_eq!(snapshot.fetch_failures, 0);
    }

    #[test]
    fn test_snapshot_serializes() {
        let metrics = MirrorMetrics::new();
        metrics.increment_mutations_submitted();
        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["mutations_submitted"], 1);
    }
}
