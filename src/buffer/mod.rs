// Buffer - bounded, deduplicating store of recent pitches
//
// The tracking unit retransmits each pitch several times. `DedupRing` drops a
// pitch whose key equals the one appended immediately before it, so
// back-to-back copies collapse into one entry while the same pitch arriving
// after something else is kept.
//
// Ownership:
// - Listener thread: pushes classified pitches into the SPSC queue
// - Buffer worker: sole owner of the ring, publishes snapshots
// - Readers: clone the latest published `Arc<[NormalizedPitch]>`

use std::collections::VecDeque;
use std::sync::Arc;

use rtrb::{Consumer, Producer};
use tokio::sync::watch;

use crate::pitch::{DedupKey, NormalizedPitch};

pub mod worker;

pub use worker::{spawn_buffer_worker, BufferWorker};

/// Immutable view of the buffer contents, oldest first
pub type PitchSnapshot = Arc<[NormalizedPitch]>;

/// Producer/consumer ends of the listener → worker queue
pub struct PitchQueue {
    pub producer: Producer<NormalizedPitch>,
    pub consumer: Consumer<NormalizedPitch>,
}

impl PitchQueue {
    /// Allocate a queue holding at most `capacity` pitches (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let (producer, consumer) = rtrb::RingBuffer::new(capacity.max(1));
        Self { producer, consumer }
    }
}

/// Result of [`DedupRing::append`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Stored; `evicted` is set when the oldest entry was dropped to make room
    Appended { evicted: bool },
    /// Same key as the previous append; nothing stored
    Duplicate,
}

/// Bounded FIFO with consecutive-duplicate suppression
#[derive(Debug, Clone)]
pub struct DedupRing {
    entries: VecDeque<NormalizedPitch>,
    capacity: usize,
    last_key: Option<DedupKey>,
}

impl DedupRing {
    /// `capacity` is clamped to at least 1
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            last_key: None,
        }
    }

    pub fn append(&mut self, pitch: NormalizedPitch) -> AppendOutcome {
        let key = pitch.dedup_key();
        if self.last_key.as_ref() == Some(&key) {
            return AppendOutcome::Duplicate;
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front();
            true
        } else {
            false
        };
        self.entries.push_back(pitch);
        self.last_key = Some(key);
        AppendOutcome::Appended { evicted }
    }

    pub fn snapshot(&self) -> PitchSnapshot {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop all entries and forget the last key
    pub fn clear(&mut self) {
        self.entries.clear();
        self.last_key = None;
    }
}

/// Read side of the published buffer contents
#[derive(Debug, Clone)]
pub struct BufferHandle {
    rx: watch::Receiver<PitchSnapshot>,
}

impl BufferHandle {
    pub fn new(rx: watch::Receiver<PitchSnapshot>) -> Self {
        Self { rx }
    }

    /// Latest published contents; never blocks the worker
    pub fn snapshot(&self) -> PitchSnapshot {
        self.rx.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.rx.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receiver notified whenever a new snapshot is published
    pub fn subscribe(&self) -> watch::Receiver<PitchSnapshot> {
        self.rx.clone()
    }
}

/// Publishing channel seeded with an empty snapshot
pub fn snapshot_channel() -> (watch::Sender<PitchSnapshot>, BufferHandle) {
    let (tx, rx) = watch::channel(PitchSnapshot::from(Vec::new()));
    (tx, BufferHandle::new(rx))
}
