//! Nearest-centroid pitch model loaded from JSON.
//!
//! ```json
//! {
//!   "feature_order_version": 1,
//!   "features": ["pitch_speed", "spin_rate", "induced_vertical"],
//!   "scale": [3.0, 150.0, 3.0],
//!   "centroids": [
//!     {"label": "Fastball", "center": [93.0, 2300.0, 16.0]},
//!     {"label": "Slider", "center": [84.0, 2500.0, 2.0]}
//!   ]
//! }
//! ```
//!
//! `scale` is optional (all 1.0) and a `center` entry may be `null` when the
//! centroid does not constrain that feature. Distance is the mean squared
//! scaled difference over features present in both the pitch and the
//! centroid.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{feature_index, FeatureVector, PitchModel, FEATURE_ORDER_VERSION};
use crate::error::ModelError;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CentroidFile {
    feature_order_version: u32,
    features: Vec<String>,
    #[serde(default)]
    scale: Option<Vec<f64>>,
    centroids: Vec<CentroidEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CentroidEntry {
    label: String,
    center: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
struct Centroid {
    label: String,
    /// (index into FEATURE_ORDER, center value, scale)
    terms: Vec<(usize, f64, f64)>,
}

/// Validated nearest-centroid model
#[derive(Debug, Clone, PartialEq)]
pub struct CentroidModel {
    centroids: Vec<Centroid>,
}

impl CentroidModel {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|err| ModelError::LoadFailed {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        Self::from_json_str(&contents).map_err(|err| match err {
            ModelError::InvalidModel { reason } if reason.starts_with("json:") => {
                ModelError::LoadFailed {
                    path: path.display().to_string(),
                    reason,
                }
            }
            other => other,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, ModelError> {
        let file: CentroidFile = serde_json::from_str(json).map_err(|err| ModelError::InvalidModel {
            reason: format!("json: {}", err),
        })?;
        Self::from_file(file)
    }

    fn from_file(file: CentroidFile) -> Result<Self, ModelError> {
        if file.feature_order_version != FEATURE_ORDER_VERSION {
            return Err(ModelError::FeatureOrderMismatch {
                expected_version: FEATURE_ORDER_VERSION,
                found_version: file.feature_order_version,
            });
        }
        if file.features.is_empty() {
            return Err(invalid("no features declared"));
        }

        let indices = file
            .features
            .iter()
            .map(|name| feature_index(name).ok_or_else(|| invalid(format!("unknown feature {:?}", name))))
            .collect::<Result<Vec<_>, _>>()?;

        let scale = match file.scale {
            Some(scale) if scale.len() != indices.len() => {
                return Err(invalid(format!(
                    "scale has {} entries for {} features",
                    scale.len(),
                    indices.len()
                )))
            }
            Some(scale) => {
                if let Some(bad) = scale.iter().find(|s| !s.is_finite() || **s <= 0.0) {
                    return Err(invalid(format!("scale {} must be positive", bad)));
                }
                scale
            }
            None => vec![1.0; indices.len()],
        };

        if file.centroids.is_empty() {
            return Err(invalid("no centroids"));
        }

        let mut centroids = Vec::with_capacity(file.centroids.len());
        for entry in file.centroids {
            if entry.label.trim().is_empty() {
                return Err(invalid("centroid with empty label"));
            }
            if entry.center.len() != indices.len() {
                return Err(invalid(format!(
                    "centroid {:?} has {} values for {} features",
                    entry.label,
                    entry.center.len(),
                    indices.len()
                )));
            }
            let terms = indices
                .iter()
                .zip(&entry.center)
                .zip(&scale)
                .filter_map(|((index, center), scale)| center.map(|c| (*index, c, *scale)))
                .collect();
            centroids.push(Centroid {
                label: entry.label,
                terms,
            });
        }

        Ok(Self { centroids })
    }

    pub fn labels(&self) -> Vec<&str> {
        self.centroids.iter().map(|c| c.label.as_str()).collect()
    }
}

impl PitchModel for CentroidModel {
    fn predict(&self, features: &FeatureVector) -> Result<String, ModelError> {
        let mut best: Option<(&str, f64)> = None;

        for centroid in &self.centroids {
            let mut sum = 0.0;
            let mut used = 0usize;
            for &(index, center, scale) in &centroid.terms {
                if let Some(value) = features.get(index) {
                    let diff = (value - center) / scale;
                    sum += diff * diff;
                    used += 1;
                }
            }
            if used == 0 {
                continue;
            }
            let distance = sum / used as f64;
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((centroid.label.as_str(), distance));
            }
        }

        best.map(|(label, _)| label.to_string())
            .ok_or(ModelError::InsufficientFeatures)
    }
}

fn invalid(reason: impl Into<String>) -> ModelError {
    ModelError::InvalidModel {
        reason: reason.into(),
    }
}
