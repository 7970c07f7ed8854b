// Aggregation scheduler - recomputes aggregates on a fixed interval
//
// Runs as a tokio task, independent of ingestion: each tick reads the latest
// buffer snapshot, context and outcomes, computes, and broadcasts the result
// when it differs from the previous one. Missed ticks are skipped rather
// than bunched up.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::{AggregateSnapshot, LiveAggregator};
use crate::buffer::BufferHandle;
use crate::context::ContextHandle;
use crate::session::OutcomeLedger;

/// Inputs read on every tick
#[derive(Clone)]
pub struct AggregationSources {
    pub buffer: BufferHandle,
    pub context: ContextHandle,
    pub outcomes: OutcomeLedger,
}

impl AggregationSources {
    /// One aggregation pass over the current state
    pub fn compute(&self, aggregator: &LiveAggregator) -> AggregateSnapshot {
        let pitches = self.buffer.snapshot();
        let context = self.context.get_context();
        let outcomes = self.outcomes.snapshot();
        aggregator.compute(&pitches, &context, &outcomes)
    }
}

/// Handle to a running aggregation task
pub struct AggregationTask {
    stop_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl AggregationTask {
    /// Signal the task to exit after its current tick
    pub fn stop(mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
    }

    /// Signal the task and wait for it to finish
    pub async fn shutdown(mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Err(err) = (&mut self.handle).await {
            tracing::warn!("[Aggregation] Task ended abnormally: {}", err);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Spawn the interval task on `runtime`.
///
/// # Arguments
/// * `aggregator` - Metric computation
/// * `sources` - Buffer, context and outcome handles read each tick
/// * `tx` - Broadcast channel for new snapshots
/// * `interval` - Refresh period (200 ms by default)
/// * `runtime` - Runtime to spawn on
pub fn spawn_aggregation(
    aggregator: Arc<LiveAggregator>,
    sources: AggregationSources,
    tx: broadcast::Sender<Arc<AggregateSnapshot>>,
    interval: Duration,
    runtime: &tokio::runtime::Handle,
) -> AggregationTask {
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

    let handle = runtime.spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last: Option<Arc<AggregateSnapshot>> = None;
        tracing::info!("[Aggregation] Refreshing every {:?}", interval);

        loop {
            tokio::select! {
                _ = &mut stop_rx => {
                    tracing::info!("[Aggregation] Stop signal received");
                    break;
                }
                _ = ticker.tick() => {
                    let snapshot = sources.compute(&aggregator);
                    if last.as_deref() == Some(&snapshot) {
                        continue;
                    }
                    let snapshot = Arc::new(snapshot);
                    // No subscribers is fine
                    let _ = tx.send(Arc::clone(&snapshot));
                    last = Some(snapshot);
                }
            }
        }
    });

    AggregationTask {
        stop_tx: Some(stop_tx),
        handle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{snapshot_channel, DedupRing};
    use crate::config::AppConfig;
    use crate::pitch::NormalizedPitch;

    fn init_test_runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn test_broadcasts_on_change_and_stops() {
        let runtime = init_test_runtime();
        let (snapshot_tx, buffer) = snapshot_channel();
        let context = ContextHandle::new();
        context.set_pitcher("Ace");
        let sources = AggregationSources {
            buffer,
            context,
            outcomes: OutcomeLedger::new(),
        };
        let (tx, mut rx) = broadcast::channel(16);
        let task = spawn_aggregation(
            Arc::new(LiveAggregator::new(&AppConfig::default())),
            sources,
            tx,
            Duration::from_millis(10),
            runtime.handle(),
        );

        runtime.block_on(async {
            let first = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(first.total_pitches, 0);
            assert_eq!(first.pitcher, "Ace");

            let mut ring = DedupRing::new(4);
            let mut pitch = NormalizedPitch::new("Ace", "Owls");
            pitch.pitch_speed = Some(90.0);
            ring.append(pitch);
            snapshot_tx.send_replace(ring.snapshot());

            let second = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(second.total_pitches, 1);

            task.shutdown().await;
        });
    }
}
