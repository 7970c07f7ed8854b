//! Replay of recorded messages through the live pipeline without a socket.
//!
//! Messages go through the same gating, normalization, classification and
//! deduplication as live datagrams, synchronously on the caller's thread.

use std::io::BufRead;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::pipeline::{PipelineOutcome, PitchPipeline};
use crate::buffer::worker::append_counted;
use crate::buffer::{DedupRing, PitchQueue};
use crate::classifier::PitchClassifier;
use crate::context::ContextHandle;
use crate::telemetry::PipelineStats;

/// Per-outcome counts for one replay
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub messages: usize,
    pub appended: usize,
    pub duplicates: usize,
    pub ignored: usize,
    pub gated: usize,
    pub dropped: usize,
}

/// Run `messages` through the pipeline into `ring`.
pub fn replay<I>(
    messages: I,
    context: &ContextHandle,
    classifier: Arc<PitchClassifier>,
    ring: &mut DedupRing,
    stats: Arc<PipelineStats>,
) -> ReplaySummary
where
    I: IntoIterator<Item = Value>,
{
    // Drained after every message, so one slot is enough
    let PitchQueue {
        producer,
        mut consumer,
    } = PitchQueue::new(1);
    let mut pipeline = PitchPipeline::new(context.clone(), classifier, producer, Arc::clone(&stats));
    let mut summary = ReplaySummary::default();

    for message in messages {
        summary.messages += 1;
        match pipeline.handle(&message) {
            PipelineOutcome::Ignored => summary.ignored += 1,
            PipelineOutcome::Gated => summary.gated += 1,
            PipelineOutcome::Dropped | PipelineOutcome::QueueFull => summary.dropped += 1,
            PipelineOutcome::Queued => {}
        }
        while let Ok(pitch) = consumer.pop() {
            if append_counted(ring, pitch, &stats) {
                summary.appended += 1;
            } else {
                summary.duplicates += 1;
            }
        }
    }

    log::info!(
        "[Replay] {} messages, {} appended, {} duplicates",
        summary.messages,
        summary.appended,
        summary.duplicates
    );
    summary
}

/// Replay newline-delimited JSON.
///
/// Blank lines are skipped; undecodable lines are logged and counted as
/// decode failures, exactly as the listener treats bad datagrams.
pub fn replay_lines<R: BufRead>(
    reader: R,
    context: &ContextHandle,
    classifier: Arc<PitchClassifier>,
    ring: &mut DedupRing,
    stats: Arc<PipelineStats>,
) -> std::io::Result<ReplaySummary> {
    let mut messages = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        stats.record_datagram();
        match serde_json::from_str::<Value>(&line) {
            Ok(message) => messages.push(message),
            Err(err) => {
                stats.record_decode_failure();
                log::warn!("[Replay] Skipping line {}: {}", index + 1, err);
            }
        }
    }
    Ok(replay(messages, context, classifier, ring, stats))
}
