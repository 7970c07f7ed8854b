//! Pitch outcomes recorded by a scorer after the pitch is buffered.
//!
//! The tracking feed carries no umpire call or batted-ball result, so these
//! live beside the buffer, keyed by `PlayId`, and are joined at aggregation
//! time.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Result of a pitch from the umpire/batter perspective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PitchCall {
    StrikeCalled,
    BallCalled,
    SwingingStrike,
    FoulBall,
    InPlayOut,
    InPlayHit,
    HitByPitch,
}

impl PitchCall {
    /// Counts toward strike rate (called, swinging, foul or in play)
    pub fn is_strike_equivalent(self) -> bool {
        matches!(
            self,
            PitchCall::StrikeCalled
                | PitchCall::SwingingStrike
                | PitchCall::FoulBall
                | PitchCall::InPlayOut
                | PitchCall::InPlayHit
        )
    }

    pub fn is_swing(self) -> bool {
        matches!(
            self,
            PitchCall::SwingingStrike | PitchCall::FoulBall | PitchCall::InPlayOut | PitchCall::InPlayHit
        )
    }

    pub fn is_contact(self) -> bool {
        matches!(self, PitchCall::FoulBall | PitchCall::InPlayOut | PitchCall::InPlayHit)
    }

    pub fn is_in_play(self) -> bool {
        matches!(self, PitchCall::InPlayOut | PitchCall::InPlayHit)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PitchCall::StrikeCalled => "StrikeCalled",
            PitchCall::BallCalled => "BallCalled",
            PitchCall::SwingingStrike => "SwingingStrike",
            PitchCall::FoulBall => "FoulBall",
            PitchCall::InPlayOut => "InPlayOut",
            PitchCall::InPlayHit => "InPlayHit",
            PitchCall::HitByPitch => "HitByPitch",
        }
    }
}

impl fmt::Display for PitchCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a call label is not recognised
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPitchCall(pub String);

impl fmt::Display for UnknownPitchCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognised pitch call {:?}", self.0)
    }
}

impl std::error::Error for UnknownPitchCall {}

impl FromStr for PitchCall {
    type Err = UnknownPitchCall;

    /// Accepts tracking-export names and the scorer table labels.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match folded.as_str() {
            "strikecalled" => Ok(PitchCall::StrikeCalled),
            "ballcalled" | "ballindirt" => Ok(PitchCall::BallCalled),
            "swingingstrike" | "strikeswinging" | "swingmiss" | "swingandmiss" => {
                Ok(PitchCall::SwingingStrike)
            }
            "foulball" | "foulballfieldable" | "foulballnotfieldable" => Ok(PitchCall::FoulBall),
            "inplayout" | "inplay" => Ok(PitchCall::InPlayOut),
            "inplayhit" => Ok(PitchCall::InPlayHit),
            "hitbypitch" => Ok(PitchCall::HitByPitch),
            _ => Err(UnknownPitchCall(s.to_string())),
        }
    }
}

/// Scorer annotation for one pitch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PitchOutcome {
    pub call: Option<PitchCall>,
    /// Batted-ball exit speed in mph
    pub exit_speed: Option<f64>,
    /// Excluded from every aggregate when set
    pub discard: bool,
}

impl PitchOutcome {
    pub fn called(call: PitchCall) -> Self {
        Self {
            call: Some(call),
            ..Self::default()
        }
    }

    pub fn in_play(call: PitchCall, exit_speed: f64) -> Self {
        Self {
            call: Some(call),
            exit_speed: Some(exit_speed),
            discard: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_export_and_table_labels() {
        assert_eq!("StrikeSwinging".parse(), Ok(PitchCall::SwingingStrike));
        assert_eq!("Swing and Miss".parse(), Ok(PitchCall::SwingingStrike));
        assert_eq!("FoulBallNotFieldable".parse(), Ok(PitchCall::FoulBall));
        assert_eq!("BallinDirt".parse(), Ok(PitchCall::BallCalled));
        assert_eq!("In Play - Hit".parse(), Ok(PitchCall::InPlayHit));
        assert_eq!("InPlay".parse(), Ok(PitchCall::InPlayOut));
        assert_eq!("Hit By Pitch".parse(), Ok(PitchCall::HitByPitch));
        assert!("Balk".parse::<PitchCall>().is_err());
    }

    #[test]
    fn swing_and_strike_sets() {
        assert!(PitchCall::StrikeCalled.is_strike_equivalent());
        assert!(!PitchCall::StrikeCalled.is_swing());
        assert!(PitchCall::FoulBall.is_swing());
        assert!(PitchCall::FoulBall.is_contact());
        assert!(!PitchCall::FoulBall.is_in_play());
        assert!(!PitchCall::BallCalled.is_strike_equivalent());
        assert!(!PitchCall::HitByPitch.is_swing());
    }
}
