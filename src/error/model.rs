// Classification model error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Model error code constants
///
/// Error code range: 3001-3005
pub struct ModelErrorCodes {}

impl ModelErrorCodes {
    /// Model file could not be read or parsed
    pub const LOAD_FAILED: i32 = 3001;

    /// Model contents are structurally invalid
    pub const INVALID_MODEL: i32 = 3002;

    /// Model was trained against a different feature order
    pub const FEATURE_ORDER_MISMATCH: i32 = 3003;

    /// Not enough features present to make a prediction
    pub const INSUFFICIENT_FEATURES: i32 = 3004;

    /// Inference backend failed
    pub const INFERENCE: i32 = 3005;
}

/// Log a model error with structured context
pub fn log_model_error(err: &ModelError, context: &str) {
    error!(
        "Model error in {}: code={}, component=PitchClassifier, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised by a [`crate::classifier::PitchModel`] backend
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    LoadFailed { path: String, reason: String },
    InvalidModel { reason: String },
    FeatureOrderMismatch { expected_version: u32, found_version: u32 },
    InsufficientFeatures,
    Inference { reason: String },
}

impl ErrorCode for ModelError {
    fn code(&self) -> i32 {
        match self {
            ModelError::LoadFailed { .. } => ModelErrorCodes::LOAD_FAILED,
            ModelError::InvalidModel { .. } => ModelErrorCodes::INVALID_MODEL,
            ModelError::FeatureOrderMismatch { .. } => ModelErrorCodes::FEATURE_ORDER_MISMATCH,
            ModelError::InsufficientFeatures => ModelErrorCodes::INSUFFICIENT_FEATURES,
            ModelError::Inference { .. } => ModelErrorCodes::INFERENCE,
        }
    }

    fn message(&self) -> String {
        match self {
            ModelError::LoadFailed { path, reason } => {
                format!("Failed to load model from {}: {}", path, reason)
            }
            ModelError::InvalidModel { reason } => format!("Invalid model: {}", reason),
            ModelError::FeatureOrderMismatch {
                expected_version,
                found_version,
            } => format!(
                "Feature order mismatch: expected version {}, model uses {}",
                expected_version, found_version
            ),
            ModelError::InsufficientFeatures => {
                "No overlapping features between pitch and model".to_string()
            }
            ModelError::Inference { reason } => format!("Inference failed: {}", reason),
        }
    }
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ModelError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ModelError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_error_codes() {
        assert_eq!(
            ModelError::LoadFailed {
                path: "m.json".to_string(),
                reason: "missing".to_string()
            }
            .code(),
            ModelErrorCodes::LOAD_FAILED
        );
        assert_eq!(
            ModelError::FeatureOrderMismatch {
                expected_version: 1,
                found_version: 2
            }
            .code(),
            3003
        );
        assert_eq!(ModelError::InsufficientFeatures.code(), 3004);
    }

    #[test]
    fn test_feature_order_mismatch_message() {
        let err = ModelError::FeatureOrderMismatch {
            expected_version: 1,
            found_version: 2,
        };
        assert!(err.message().contains("expected version 1"));
        assert!(err.message().contains("model uses 2"));
    }
}
