//! Pipeline counters.
//!
//! Every drop, fallback and suppression on the datagram path is counted here
//! so a session can report how much of the feed actually reached the buffer.
//! Counters are plain atomics: the listener thread and the buffer worker
//! update them without coordinating.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

/// Shared counters for one session manager
#[derive(Debug, Default)]
pub struct PipelineStats {
    datagrams_received: AtomicU64,
    decode_failures: AtomicU64,
    ignored_kind: AtomicU64,
    gated_warmup: AtomicU64,
    normalization_failures: AtomicU64,
    classification_fallbacks: AtomicU64,
    queued: AtomicU64,
    queue_full: AtomicU64,
    appended: AtomicU64,
    duplicates_suppressed: AtomicU64,
    evicted: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`] for CLI/log reporting
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StatsSnapshot {
    pub captured_at: Option<DateTime<Utc>>,
    pub datagrams_received: u64,
    pub decode_failures: u64,
    pub ignored_kind: u64,
    pub gated_warmup: u64,
    pub normalization_failures: u64,
    pub classification_fallbacks: u64,
    pub queued: u64,
    pub queue_full: u64,
    pub appended: u64,
    pub duplicates_suppressed: u64,
    pub evicted: u64,
}

macro_rules! counter {
    ($record:ident, $field:ident) => {
        pub fn $record(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
        }
    };
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    counter!(record_datagram, datagrams_received);
    counter!(record_decode_failure, decode_failures);
    counter!(record_ignored_kind, ignored_kind);
    counter!(record_gated, gated_warmup);
    counter!(record_normalization_failure, normalization_failures);
    counter!(record_classification_fallback, classification_fallbacks);
    counter!(record_queued, queued);
    counter!(record_queue_full, queue_full);
    counter!(record_appended, appended);
    counter!(record_duplicate, duplicates_suppressed);
    counter!(record_evicted, evicted);

    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        StatsSnapshot {
            captured_at: Some(Utc::now()),
            datagrams_received: load(&self.datagrams_received),
            decode_failures: load(&self.decode_failures),
            ignored_kind: load(&self.ignored_kind),
            gated_warmup: load(&self.gated_warmup),
            normalization_failures: load(&self.normalization_failures),
            classification_fallbacks: load(&self.classification_fallbacks),
            queued: load(&self.queued),
            queue_full: load(&self.queue_full),
            appended: load(&self.appended),
            duplicates_suppressed: load(&self.duplicates_suppressed),
            evicted: load(&self.evicted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_independent() {
        let stats = PipelineStats::new();
        stats.record_datagram();
        stats.record_datagram();
        stats.record_gated();
        stats.record_duplicate();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.datagrams_received, 2);
        assert_eq!(snapshot.gated_warmup, 1);
        assert_eq!(snapshot.duplicates_suppressed, 1);
        assert_eq!(snapshot.appended, 0);
        assert!(snapshot.captured_at.is_some());
    }

    #[test]
    fn snapshot_serializes() {
        let json = serde_json::to_value(PipelineStats::new().snapshot()).unwrap();
        assert_eq!(json["queue_full"], 0);
        assert!(json.get("classification_fallbacks").is_some());
    }
}
