// Buffer worker - the single owner of the dedup ring
//
// Pops classified pitches from the listener queue, appends them to the ring
// and publishes the new contents as one immutable snapshot per drained batch.
// Readers swap in the new `Arc` atomically, so an append is either fully
// visible or not at all.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rtrb::{Consumer, PopError};
use tokio::sync::watch;

use super::{AppendOutcome, DedupRing, PitchSnapshot};
use crate::error::SessionError;
use crate::pitch::NormalizedPitch;
use crate::telemetry::PipelineStats;

/// Idle sleep between polls of an empty queue
const IDLE_SLEEP: Duration = Duration::from_millis(1);

/// Running buffer worker thread
///
/// The ring is handed back by [`BufferWorker::stop`] so its contents survive
/// a stop/start cycle of live mode.
pub struct BufferWorker {
    running: Arc<AtomicBool>,
    handle: JoinHandle<DedupRing>,
}

impl BufferWorker {
    /// Drain the queue, stop the thread and return the ring
    pub fn stop(self) -> Result<DedupRing, SessionError> {
        self.running.store(false, Ordering::SeqCst);
        self.handle.join().map_err(|_| {
            tracing::error!("[BufferWorker] Worker thread panicked");
            SessionError::WorkerPanicked
        })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Spawn the worker that owns `ring`.
///
/// # Arguments
/// * `consumer` - Read end of the listener queue
/// * `ring` - Ring to append to; its current contents are published first
/// * `snapshot_tx` - Channel the contents are published on
/// * `stats` - Counters for appends, duplicates and evictions
pub fn spawn_buffer_worker(
    consumer: Consumer<NormalizedPitch>,
    ring: DedupRing,
    snapshot_tx: Arc<watch::Sender<PitchSnapshot>>,
    stats: Arc<PipelineStats>,
) -> Result<BufferWorker, SessionError> {
    let running = Arc::new(AtomicBool::new(true));
    let worker = Worker {
        consumer,
        ring,
        snapshot_tx,
        stats,
        running: Arc::clone(&running),
    };

    let handle = thread::Builder::new()
        .name("pitch-buffer".to_string())
        .spawn(move || worker.run())
        .map_err(|err| {
            tracing::error!("[BufferWorker] Failed to spawn worker thread: {}", err);
            SessionError::WorkerPanicked
        })?;

    Ok(BufferWorker { running, handle })
}

struct Worker {
    consumer: Consumer<NormalizedPitch>,
    ring: DedupRing,
    snapshot_tx: Arc<watch::Sender<PitchSnapshot>>,
    stats: Arc<PipelineStats>,
    running: Arc<AtomicBool>,
}

impl Worker {
    fn run(mut self) -> DedupRing {
        tracing::info!(
            "[BufferWorker] Starting buffer loop (capacity {}, {} retained)",
            self.ring.capacity(),
            self.ring.len()
        );
        self.snapshot_tx.send_replace(self.ring.snapshot());

        loop {
            if self.drain() {
                self.snapshot_tx.send_replace(self.ring.snapshot());
            }

            // Queue is empty here; anything pushed before the flag was
            // cleared has been appended
            if !self.running.load(Ordering::SeqCst) {
                tracing::info!("[BufferWorker] Shutdown flag set and queue empty, exiting");
                break;
            }
            if self.consumer.is_abandoned() && self.consumer.is_empty() {
                tracing::info!("[BufferWorker] Producer dropped, exiting");
                break;
            }

            thread::sleep(IDLE_SLEEP);
        }

        self.ring
    }

    /// Append everything queued; returns whether the ring changed
    fn drain(&mut self) -> bool {
        let mut changed = false;
        loop {
            match self.consumer.pop() {
                Ok(pitch) => changed |= append_counted(&mut self.ring, pitch, &self.stats),
                Err(PopError::Empty) => return changed,
            }
        }
    }
}

/// Append `pitch` to `ring`, recording the result in `stats`.
///
/// Returns whether the ring changed.
pub(crate) fn append_counted(ring: &mut DedupRing, pitch: NormalizedPitch, stats: &PipelineStats) -> bool {
    match ring.append(pitch) {
        AppendOutcome::Appended { evicted } => {
            stats.record_appended();
            if evicted {
                stats.record_evicted();
            }
            true
        }
        AppendOutcome::Duplicate => {
            tracing::debug!("[BufferWorker] Suppressed retransmitted pitch");
            stats.record_duplicate();
            false
        }
    }
}
