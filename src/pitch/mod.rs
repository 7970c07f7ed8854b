//! Pitch records flowing through the live pipeline.
//!
//! `message` holds the nested wire shape sent by the tracking unit,
//! `normalizer` flattens it into [`NormalizedPitch`], and `outcome` carries
//! the call/contact annotations a scorer attaches afterwards.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

pub mod message;
pub mod normalizer;
pub mod outcome;

pub use message::RawMessage;
pub use normalizer::{normalize, parse_clock_time, tilt_to_degrees};
pub use outcome::{PitchCall, PitchOutcome};

/// Label assigned when no classification is available
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Flat, immutable record of one pitch event.
///
/// Every measurement is optional: an absent value means the sensor did not
/// report it, which is distinct from zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPitch {
    pub play_id: Option<String>,
    /// Time of day of the event, whole seconds
    pub timestamp: Option<NaiveTime>,
    pub pitch_speed: Option<f64>,
    pub zone_speed: Option<f64>,
    pub spin_rate: Option<f64>,
    pub spin_axis: Option<f64>,
    pub tilt_degrees: Option<f64>,
    pub release_extension: Option<f64>,
    pub release_height: Option<f64>,
    pub release_side: Option<f64>,
    pub release_vert_angle: Option<f64>,
    pub release_horiz_angle: Option<f64>,
    pub movement_horizontal: Option<f64>,
    pub movement_vertical: Option<f64>,
    pub induced_vertical: Option<f64>,
    pub plate_loc_side: Option<f64>,
    pub plate_loc_height: Option<f64>,
    pub pitcher: String,
    pub team: String,
    pub pitch_type: String,
}

impl NormalizedPitch {
    /// Empty record attributed to `pitcher`/`team`, labelled "Unknown".
    pub fn new(pitcher: impl Into<String>, team: impl Into<String>) -> Self {
        Self {
            play_id: None,
            timestamp: None,
            pitch_speed: None,
            zone_speed: None,
            spin_rate: None,
            spin_axis: None,
            tilt_degrees: None,
            release_extension: None,
            release_height: None,
            release_side: None,
            release_vert_angle: None,
            release_horiz_angle: None,
            movement_horizontal: None,
            movement_vertical: None,
            induced_vertical: None,
            plate_loc_side: None,
            plate_loc_height: None,
            pitcher: pitcher.into(),
            team: team.into(),
            pitch_type: UNKNOWN_LABEL.to_string(),
        }
    }

    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            timestamp: self.timestamp,
            speed_tenths: self.pitch_speed.map(|speed| (speed * 10.0).round() as i64),
            pitch_type: self.pitch_type.clone(),
        }
    }

    /// Plate location as `(side, height)` when both coordinates are present.
    pub fn plate_location(&self) -> Option<(f64, f64)> {
        Some((self.plate_loc_side?, self.plate_loc_height?))
    }
}

/// Key used to suppress retransmitted copies of the same pitch.
///
/// Speed is held in tenths of a mph so the key compares exactly. Two distinct
/// pitches with the same time of day, rounded speed and label collide; that
/// ambiguity is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub timestamp: Option<NaiveTime>,
    pub speed_tenths: Option<i64>,
    pub pitch_type: String,
}
