// Classifier - assigns a pitch-type label to each normalized pitch
//
// The model is injected behind the `PitchModel` trait so the pipeline never
// depends on a particular backend. Models consume a `FeatureVector` laid out
// in `FEATURE_ORDER`; the order is versioned so a model trained against a
// different layout is rejected at load time instead of silently mislabelling.
//
// Classification never drops a pitch: any model error, empty label or panic
// inside the model yields the "Unknown" label.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{log_model_error, ModelError};
use crate::pitch::{NormalizedPitch, UNKNOWN_LABEL};

pub mod centroid;

pub use centroid::CentroidModel;

/// Bumped whenever `FEATURE_ORDER` changes
pub const FEATURE_ORDER_VERSION: u32 = 1;

/// Number of model input features
pub const FEATURE_COUNT: usize = 15;

/// Model input layout, by `NormalizedPitch` field name
pub const FEATURE_ORDER: [&str; FEATURE_COUNT] = [
    "pitch_speed",
    "zone_speed",
    "spin_rate",
    "spin_axis",
    "tilt_degrees",
    "release_extension",
    "release_height",
    "release_side",
    "release_vert_angle",
    "release_horiz_angle",
    "movement_horizontal",
    "movement_vertical",
    "induced_vertical",
    "plate_loc_height",
    "plate_loc_side",
];

/// Position of `name` in `FEATURE_ORDER`
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_ORDER.iter().position(|feature| *feature == name)
}

/// Model input; absent measurements stay absent rather than becoming zero
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector(pub [Option<f64>; FEATURE_COUNT]);

impl FeatureVector {
    pub fn from_pitch(pitch: &NormalizedPitch) -> Self {
        Self([
            pitch.pitch_speed,
            pitch.zone_speed,
            pitch.spin_rate,
            pitch.spin_axis,
            pitch.tilt_degrees,
            pitch.release_extension,
            pitch.release_height,
            pitch.release_side,
            pitch.release_vert_angle,
            pitch.release_horiz_angle,
            pitch.movement_horizontal,
            pitch.movement_vertical,
            pitch.induced_vertical,
            pitch.plate_loc_height,
            pitch.plate_loc_side,
        ])
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied().flatten()
    }

    pub fn present_count(&self) -> usize {
        self.0.iter().filter(|value| value.is_some()).count()
    }
}

/// Pitch-type prediction backend
///
/// Implementations must be callable from the listener thread while other
/// threads hold clones of the same `Arc`.
pub trait PitchModel: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> Result<String, ModelError>;
}

/// Backend used when no model is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct UnknownModel;

impl PitchModel for UnknownModel {
    fn predict(&self, _features: &FeatureVector) -> Result<String, ModelError> {
        Ok(UNKNOWN_LABEL.to_string())
    }
}

/// Wraps a model and guarantees a label for every pitch
pub struct PitchClassifier {
    model: Arc<dyn PitchModel>,
    fallbacks: AtomicU64,
}

impl PitchClassifier {
    pub fn new(model: Arc<dyn PitchModel>) -> Self {
        Self {
            model,
            fallbacks: AtomicU64::new(0),
        }
    }

    /// Classifier that labels every pitch "Unknown"
    pub fn unknown() -> Self {
        Self::new(Arc::new(UnknownModel))
    }

    /// Build from an optional centroid model file.
    ///
    /// A missing or invalid model is logged and replaced by [`UnknownModel`];
    /// the session still runs, just without labels.
    pub fn from_model_path(path: Option<&std::path::Path>) -> Self {
        match path {
            None => Self::unknown(),
            Some(path) => match CentroidModel::load(path) {
                Ok(model) => {
                    log::info!(
                        "[Classifier] Loaded centroid model from {:?} ({} labels)",
                        path,
                        model.labels().len()
                    );
                    Self::new(Arc::new(model))
                }
                Err(err) => {
                    log_model_error(&err, "PitchClassifier::from_model_path");
                    Self::unknown()
                }
            },
        }
    }

    /// Label for `pitch`, falling back to "Unknown"
    pub fn classify(&self, pitch: &NormalizedPitch) -> String {
        self.try_classify(pitch)
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
    }

    /// Label for `pitch`, or `None` when the model failed and the caller
    /// should use the fallback label.
    pub fn try_classify(&self, pitch: &NormalizedPitch) -> Option<String> {
        let features = FeatureVector::from_pitch(pitch);
        let model = &self.model;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| model.predict(&features)));

        match outcome {
            Ok(Ok(label)) if !label.trim().is_empty() => Some(label),
            Ok(Ok(_)) => {
                log::warn!("[Classifier] Model returned an empty label");
                self.record_fallback()
            }
            Ok(Err(err)) => {
                log_model_error(&err, "PitchClassifier::classify");
                self.record_fallback()
            }
            Err(_) => {
                log::error!("[Classifier] Model panicked during prediction");
                self.record_fallback()
            }
        }
    }

    /// Number of pitches that fell back to "Unknown" because of a model fault
    pub fn fallback_count(&self) -> u64 {
        self.fallbacks.load(Ordering::Relaxed)
    }

    fn record_fallback(&self) -> Option<String> {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
        None
    }
}

impl Default for PitchClassifier {
    fn default() -> Self {
        Self::unknown()
    }
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
