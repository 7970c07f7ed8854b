// PitchPipeline - the per-datagram path run on the listener thread
//
// gate on kind → gate on category → normalize → classify → enqueue
//
// Every step is non-blocking: the context is read from a watch channel and
// the queue push is wait-free. Each early exit is counted in PipelineStats.

use std::sync::Arc;

use rtrb::{Producer, PushError};
use serde_json::Value;

use crate::classifier::PitchClassifier;
use crate::context::ContextHandle;
use crate::pitch::message::{message_kind, PITCH_KIND};
use crate::pitch::{normalize, NormalizedPitch, UNKNOWN_LABEL};
use crate::telemetry::PipelineStats;

/// What happened to one decoded message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Not a pitch message
    Ignored,
    /// Pitch arrived while the category is not Live
    Gated,
    /// Pitch message without a usable `Pitch` object
    Dropped,
    /// Handed to the buffer worker
    Queued,
    /// Buffer worker queue full; pitch lost
    QueueFull,
}

/// Listener-side processing state
pub struct PitchPipeline {
    context: ContextHandle,
    classifier: Arc<PitchClassifier>,
    producer: Producer<NormalizedPitch>,
    stats: Arc<PipelineStats>,
}

impl PitchPipeline {
    pub fn new(
        context: ContextHandle,
        classifier: Arc<PitchClassifier>,
        producer: Producer<NormalizedPitch>,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            context,
            classifier,
            producer,
            stats,
        }
    }

    pub fn handle(&mut self, message: &Value) -> PipelineOutcome {
        if message_kind(message) != Some(PITCH_KIND) {
            self.stats.record_ignored_kind();
            return PipelineOutcome::Ignored;
        }

        let context = self.context.get_context();
        if !context.is_live() {
            self.stats.record_gated();
            log::debug!("[Pipeline] Skipping pitch during {}", context.category);
            return PipelineOutcome::Gated;
        }

        let Some(mut pitch) = normalize(message, &context) else {
            self.stats.record_normalization_failure();
            log::warn!("[Pipeline] Dropping pitch message without a Pitch object");
            return PipelineOutcome::Dropped;
        };

        pitch.pitch_type = match self.classifier.try_classify(&pitch) {
            Some(label) => label,
            None => {
                self.stats.record_classification_fallback();
                UNKNOWN_LABEL.to_string()
            }
        };

        match self.producer.push(pitch) {
            Ok(()) => {
                self.stats.record_queued();
                PipelineOutcome::Queued
            }
            Err(PushError::Full(_)) => {
                self.stats.record_queue_full();
                log::warn!("[Pipeline] Buffer queue full, dropping pitch");
                PipelineOutcome::QueueFull
            }
        }
    }
}
