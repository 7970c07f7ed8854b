// SessionManager - owns the live pipeline for one venue session
//
// Wires listener → pipeline → queue → buffer worker, and (when a tokio
// runtime is available) the aggregation schedule. Consumers read through
// the buffer/context/outcome handles, which stay valid across stop/start.
//
// Lifecycle:
// - idle:  ring held by the manager
// - live:  ring owned by the worker thread, listener receiving
// - stop:  listener joined first so nothing more is queued, then the worker
//          drains and hands the ring back

use std::io::BufRead;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};

use crate::aggregation::scheduler::AggregationSources;
use crate::aggregation::{spawn_aggregation, AggregateSnapshot, AggregationTask, LiveAggregator};
use crate::buffer::{self, spawn_buffer_worker, BufferHandle, BufferWorker, DedupRing, PitchQueue, PitchSnapshot};
use crate::classifier::PitchClassifier;
use crate::config::AppConfig;
use crate::context::{ContextHandle, SessionContext};
use crate::error::{log_ingest_error, log_session_error, SessionError};
use crate::network::UdpListener;
use crate::telemetry::{PipelineStats, StatsSnapshot};

pub mod offline;
pub mod outcomes;
pub mod pipeline;

pub use offline::{replay, replay_lines, ReplaySummary};
pub use outcomes::{OutcomeLedger, OutcomeMap};
pub use pipeline::{PipelineOutcome, PitchPipeline};

/// Aggregate broadcast buffer; slow subscribers lag rather than block
const AGGREGATE_CHANNEL_CAPACITY: usize = 16;

struct LiveSession {
    listener: UdpListener,
    worker: BufferWorker,
    aggregation: Option<AggregationTask>,
    local_addr: SocketAddr,
}

pub struct SessionManager {
    config: AppConfig,
    classifier: Arc<PitchClassifier>,
    context: ContextHandle,
    outcomes: OutcomeLedger,
    stats: Arc<PipelineStats>,
    aggregator: Arc<LiveAggregator>,
    snapshot_tx: Arc<watch::Sender<PitchSnapshot>>,
    buffer: BufferHandle,
    aggregate_tx: broadcast::Sender<Arc<AggregateSnapshot>>,
    runtime: Option<Handle>,
    /// Held while idle; owned by the worker while live
    ring: Option<DedupRing>,
    live: Option<LiveSession>,
}

impl SessionManager {
    pub fn new(config: AppConfig, classifier: PitchClassifier) -> Self {
        let (snapshot_tx, buffer) = buffer::snapshot_channel();
        let (aggregate_tx, _) = broadcast::channel(AGGREGATE_CHANNEL_CAPACITY);
        Self {
            aggregator: Arc::new(LiveAggregator::new(&config)),
            ring: Some(DedupRing::new(config.buffer.capacity)),
            classifier: Arc::new(classifier),
            context: ContextHandle::new(),
            outcomes: OutcomeLedger::new(),
            stats: Arc::new(PipelineStats::new()),
            snapshot_tx: Arc::new(snapshot_tx),
            buffer,
            aggregate_tx,
            runtime: None,
            live: None,
            config,
        }
    }

    /// Build from config, loading the classifier from `classifier.model_path`
    pub fn from_config(config: AppConfig) -> Self {
        let classifier = PitchClassifier::from_model_path(config.classifier.model_path.as_deref());
        Self::new(config, classifier)
    }

    /// Run the aggregation schedule on `runtime` instead of the runtime
    /// current at `start_live_mode` time
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Start receiving.
    ///
    /// # Returns
    /// The bound UDP address.
    ///
    /// # Errors
    /// `AlreadyRunning` when live, `Listener` when the socket cannot be
    /// bound. On error the session stays idle with its buffer intact.
    pub fn start_live_mode(&mut self) -> Result<SocketAddr, SessionError> {
        if self.live.is_some() {
            return Err(SessionError::AlreadyRunning);
        }

        let capacity = self.config.buffer.capacity;
        let ring = self.ring.take().unwrap_or_else(|| DedupRing::new(capacity));
        let PitchQueue { producer, consumer } = PitchQueue::new(self.config.listener.queue_capacity);

        let worker = match spawn_buffer_worker(
            consumer,
            ring,
            Arc::clone(&self.snapshot_tx),
            Arc::clone(&self.stats),
        ) {
            Ok(worker) => worker,
            Err(err) => {
                // The ring moved into the failed spawn
                self.ring = Some(DedupRing::new(capacity));
                return Err(err);
            }
        };

        let mut pipeline = PitchPipeline::new(
            self.context.clone(),
            Arc::clone(&self.classifier),
            producer,
            Arc::clone(&self.stats),
        );
        let mut listener = UdpListener::with_stats(self.config.listener.clone(), Arc::clone(&self.stats));

        let local_addr = match listener.start(move |message| {
            pipeline.handle(&message);
        }) {
            Ok(addr) => addr,
            Err(err) => {
                log_ingest_error(&err, "SessionManager::start_live_mode");
                self.ring = Some(worker.stop().unwrap_or_else(|_| DedupRing::new(capacity)));
                return Err(SessionError::Listener(err));
            }
        };

        let aggregation = self.spawn_aggregation();
        if aggregation.is_none() {
            log::warn!("[Session] No tokio runtime available; aggregates only via aggregate_now()");
        }

        log::info!("[Session] Live mode started on {}", local_addr);
        self.live = Some(LiveSession {
            listener,
            worker,
            aggregation,
            local_addr,
        });
        Ok(local_addr)
    }

    fn spawn_aggregation(&self) -> Option<AggregationTask> {
        let runtime = self.runtime.clone().or_else(|| Handle::try_current().ok())?;
        let sources = AggregationSources {
            buffer: self.buffer.clone(),
            context: self.context.clone(),
            outcomes: self.outcomes.clone(),
        };
        Some(spawn_aggregation(
            Arc::clone(&self.aggregator),
            sources,
            self.aggregate_tx.clone(),
            self.config.aggregation.refresh_interval(),
            &runtime,
        ))
    }

    /// Stop receiving; buffered pitches are kept for the next start.
    pub fn stop(&mut self) -> Result<(), SessionError> {
        let live = self.live.take().ok_or(SessionError::NotRunning)?;
        let LiveSession {
            mut listener,
            worker,
            aggregation,
            ..
        } = live;

        if let Some(task) = aggregation {
            task.stop();
        }

        // Joining the listener drops the pipeline and its queue producer
        let listener_result = listener.stop();
        drop(listener);

        match worker.stop() {
            Ok(ring) => self.ring = Some(ring),
            Err(err) => {
                log_session_error(&err, "SessionManager::stop");
                self.ring = Some(DedupRing::new(self.config.buffer.capacity));
                return Err(err);
            }
        }

        log::info!("[Session] Live mode stopped ({} pitches buffered)", self.buffer.len());
        listener_result.map_err(SessionError::Listener)
    }

    /// Stop if live, then reset the context, outcomes and buffer.
    pub fn end_session(&mut self) -> Result<(), SessionError> {
        let stopped = if self.live.is_some() { self.stop() } else { Ok(()) };

        self.context.reset();
        self.outcomes.clear();
        let mut ring = self
            .ring
            .take()
            .unwrap_or_else(|| DedupRing::new(self.config.buffer.capacity));
        ring.clear();
        self.snapshot_tx.send_replace(ring.snapshot());
        self.ring = Some(ring);
        log::info!("[Session] Session ended");

        stopped
    }

    pub fn is_live(&self) -> bool {
        self.live.is_some()
    }

    /// Bound UDP address while live
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.live.as_ref().map(|live| live.local_addr)
    }

    /// Current buffer contents, oldest first
    pub fn get_buffer(&self) -> PitchSnapshot {
        self.buffer.snapshot()
    }

    pub fn buffer_handle(&self) -> BufferHandle {
        self.buffer.clone()
    }

    pub fn get_context(&self) -> SessionContext {
        self.context.get_context()
    }

    /// Handle for changing pitcher, team and category
    pub fn context(&self) -> &ContextHandle {
        &self.context
    }

    pub fn outcomes(&self) -> &OutcomeLedger {
        &self.outcomes
    }

    pub fn subscribe_aggregates(&self) -> broadcast::Receiver<Arc<AggregateSnapshot>> {
        self.aggregate_tx.subscribe()
    }

    /// Compute aggregates from the current state immediately
    pub fn aggregate_now(&self) -> AggregateSnapshot {
        let sources = AggregationSources {
            buffer: self.buffer.clone(),
            context: self.context.clone(),
            outcomes: self.outcomes.clone(),
        };
        sources.compute(&self.aggregator)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Replay recorded messages into the buffer while idle
    pub fn replay<I>(&mut self, messages: I) -> Result<ReplaySummary, SessionError>
    where
        I: IntoIterator<Item = serde_json::Value>,
    {
        if self.live.is_some() {
            return Err(SessionError::AlreadyRunning);
        }
        let capacity = self.config.buffer.capacity;
        let ring = self.ring.get_or_insert_with(|| DedupRing::new(capacity));
        let summary = offline::replay(
            messages,
            &self.context,
            Arc::clone(&self.classifier),
            ring,
            Arc::clone(&self.stats),
        );
        self.snapshot_tx.send_replace(ring.snapshot());
        Ok(summary)
    }

    /// Replay newline-delimited JSON while idle; bad lines count as decode
    /// failures
    pub fn replay_lines<R: BufRead>(&mut self, reader: R) -> Result<ReplaySummary, SessionError> {
        if self.live.is_some() {
            return Err(SessionError::AlreadyRunning);
        }
        let capacity = self.config.buffer.capacity;
        let ring = self.ring.get_or_insert_with(|| DedupRing::new(capacity));
        let summary = offline::replay_lines(
            reader,
            &self.context,
            Arc::clone(&self.classifier),
            ring,
            Arc::clone(&self.stats),
        )
        .map_err(|err| SessionError::ReplayInput(err.into()))?;
        self.snapshot_tx.send_replace(ring.snapshot());
        Ok(summary)
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if self.live.is_some() {
            if let Err(err) = self.stop() {
                log_session_error(&err, "SessionManager::drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn idle_manager() -> SessionManager {
        SessionManager::new(AppConfig::default(), PitchClassifier::unknown())
    }

    #[test]
    fn test_stop_when_idle_is_not_running() {
        let mut manager = idle_manager();
        assert!(matches!(manager.stop(), Err(SessionError::NotRunning)));
        assert!(manager.end_session().is_ok());
    }

    #[test]
    fn test_replay_populates_buffer_and_aggregates() {
        let mut manager = idle_manager();
        manager.context().set_pitcher("Ace");
        let summary = manager
            .replay(vec![json!({
                "Kind": "Pitch",
                "PlayId": "p1",
                "Pitch": {"Speed": 87.15, "Tilt": "1:30", "Location": {"Side": 0.2, "Height": 2.5}}
            })])
            .unwrap();
        assert_eq!(summary.appended, 1);

        let buffer = manager.get_buffer();
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer[0].tilt_degrees, Some(45.0));
        assert_eq!(buffer[0].pitcher, "Ace");

        manager
            .outcomes()
            .record("p1", crate::pitch::PitchOutcome::called(crate::pitch::PitchCall::StrikeCalled));
        let aggregate = manager.aggregate_now();
        assert_eq!(aggregate.total_pitches, 1);
        assert_eq!(aggregate.strike_rate, 1.0);
    }

    #[test]
    fn test_replay_lines_counts_bad_lines() {
        let mut manager = idle_manager();
        let input = concat!(
            "{\"Kind\": \"Pitch\", \"PlayId\": \"p1\", \"Pitch\": {\"Speed\": 90.0}}\n",
            "\n",
            "not json\n",
            "{\"Kind\": \"Hit\"}\n",
        );
        let summary = manager.replay_lines(input.as_bytes()).unwrap();

        assert_eq!(summary.messages, 2);
        assert_eq!(summary.appended, 1);
        assert_eq!(summary.ignored, 1);
        assert_eq!(manager.get_buffer().len(), 1);
        let stats = manager.stats();
        assert_eq!(stats.datagrams_received, 3);
        assert_eq!(stats.decode_failures, 1);
    }

    #[test]
    fn test_end_session_resets_everything() {
        let mut manager = idle_manager();
        manager.context().set_pitcher("Ace");
        manager
            .replay(vec![json!({"Kind": "Pitch", "PlayId": "p1", "Pitch": {"Speed": 90.0}})])
            .unwrap();
        manager.outcomes().mark_discarded("p1", true);

        manager.end_session().unwrap();
        assert!(manager.get_buffer().is_empty());
        assert!(manager.outcomes().is_empty());
        assert_eq!(manager.get_context(), SessionContext::default());
    }

    #[test]
    fn test_bind_failure_leaves_session_idle() {
        let mut config = AppConfig::default();
        config.listener.bind_address = "192.0.2.1".to_string();
        config.listener.port = 0;
        let mut manager = SessionManager::new(config, PitchClassifier::unknown());
        manager
            .replay(vec![json!({"Kind": "Pitch", "Pitch": {"Speed": 90.0}})])
            .unwrap();

        assert!(matches!(
            manager.start_live_mode(),
            Err(SessionError::Listener(_))
        ));
        assert!(!manager.is_live());
        assert_eq!(manager.get_buffer().len(), 1);
    }
}
