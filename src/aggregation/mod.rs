// Aggregation - derives live performance metrics from the buffer snapshot
//
// `LiveAggregator::compute` is a pure function of (pitches, context,
// outcomes): nothing carries over between passes, so recomputing an
// unchanged snapshot yields an identical result. The scheduler in
// `scheduler` runs it on a fixed interval and broadcasts the output.
//
// Outcome-derived metrics only see pitches whose `PlayId` has a recorded
// call; a pitch without one still counts toward totals and location rates.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::context::SessionContext;
use crate::pitch::{NormalizedPitch, PitchCall, PitchOutcome};

pub mod scheduler;
pub mod zone_grid;

pub use scheduler::{spawn_aggregation, AggregationTask};
pub use zone_grid::{StrikeZone, ZoneGrid, GRID_SIZE};

/// Weight of the swinging-strike share in a cell's success score
const SWINGING_WEIGHT: f64 = 0.4;
/// Weight of the called-strike share
const CALLED_WEIGHT: f64 = 0.3;
/// Weight of the weak-contact share of balls in play
const WEAK_CONTACT_WEIGHT: f64 = 0.3;

/// Per pitch-type summary row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitchTypeSummary {
    pub pitch_type: String,
    pub count: usize,
    /// Mean over pitches reporting a speed
    pub avg_speed: Option<f64>,
    /// Mean over pitches reporting a spin rate
    pub avg_spin: Option<f64>,
    pub strike_rate: f64,
    /// Swings over all pitches of the type
    pub swing_rate: f64,
    pub whiff_rate: f64,
    /// Contact over swings
    pub contact_rate: f64,
    /// Hard-hit balls over balls in play
    pub hard_hit_rate: f64,
}

/// One populated heat-map cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneCell {
    pub row: usize,
    pub col: usize,
    pub total: usize,
    pub swinging_strikes: usize,
    pub called_strikes: usize,
    pub balls_in_play: usize,
    pub weak_contact: usize,
    pub success_score: f64,
}

/// Everything the display layer needs for one refresh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSnapshot {
    pub pitcher: String,
    pub total_pitches: usize,
    pub strike_rate: f64,
    pub swing_rate: f64,
    pub whiff_rate: f64,
    pub chase_rate: f64,
    pub zone_rate: f64,
    pub contact_rate: f64,
    pub hard_hit_rate: f64,
    /// Sorted by pitch-type label
    pub by_pitch_type: Vec<PitchTypeSummary>,
    /// Non-empty cells, ordered by (row, col)
    pub heat_map: Vec<ZoneCell>,
}

impl AggregateSnapshot {
    /// Snapshot for a pitcher with no pitches
    pub fn empty(pitcher: impl Into<String>) -> Self {
        Self {
            pitcher: pitcher.into(),
            total_pitches: 0,
            strike_rate: 0.0,
            swing_rate: 0.0,
            whiff_rate: 0.0,
            chase_rate: 0.0,
            zone_rate: 0.0,
            contact_rate: 0.0,
            hard_hit_rate: 0.0,
            by_pitch_type: Vec::new(),
            heat_map: Vec::new(),
        }
    }
}

/// Stateless metric computation over a buffer snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct LiveAggregator {
    zone: StrikeZone,
    grid: ZoneGrid,
    weak_contact_exit_speed: f64,
    hard_hit_exit_speed: f64,
}

impl LiveAggregator {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            zone: StrikeZone::new(&config.strike_zone),
            grid: ZoneGrid::new(&config.heat_map),
            weak_contact_exit_speed: config.aggregation.weak_contact_exit_speed,
            hard_hit_exit_speed: config.aggregation.hard_hit_exit_speed,
        }
    }

    /// Aggregate the context pitcher's pitches.
    ///
    /// Pitches attributed to another pitcher, and pitches whose outcome is
    /// marked discarded, are ignored.
    pub fn compute(
        &self,
        pitches: &[NormalizedPitch],
        context: &SessionContext,
        outcomes: &HashMap<String, PitchOutcome>,
    ) -> AggregateSnapshot {
        let selected: Vec<(&NormalizedPitch, Option<&PitchOutcome>)> = pitches
            .iter()
            .filter(|pitch| pitch.pitcher == context.pitcher)
            .map(|pitch| (pitch, outcome_for(pitch, outcomes)))
            .filter(|(_, outcome)| !outcome.map_or(false, |o| o.discard))
            .collect();

        if selected.is_empty() {
            return AggregateSnapshot::empty(context.pitcher.clone());
        }

        let mut overall = Tally::default();
        let mut by_type: BTreeMap<&str, TypeTally> = BTreeMap::new();
        let mut cells: BTreeMap<(usize, usize), CellTally> = BTreeMap::new();
        let mut located = 0usize;
        let mut in_zone = 0usize;
        let mut outside = 0usize;
        let mut chases = 0usize;

        for &(pitch, outcome) in &selected {
            let call = outcome.and_then(|o| o.call);
            let exit_speed = outcome.and_then(|o| o.exit_speed);

            overall.observe(call, exit_speed, self.hard_hit_exit_speed);

            let row = by_type.entry(pitch.pitch_type.as_str()).or_default();
            row.tally.observe(call, exit_speed, self.hard_hit_exit_speed);
            row.speed.observe(pitch.pitch_speed);
            row.spin.observe(pitch.spin_rate);

            let Some((side, height)) = pitch.plate_location() else {
                continue;
            };
            located += 1;
            if self.zone.contains(side, height) {
                in_zone += 1;
            } else {
                outside += 1;
                if call.map_or(false, PitchCall::is_swing) {
                    chases += 1;
                }
            }

            if let Some(cell) = self.grid.cell_for(side, height) {
                cells
                    .entry(cell)
                    .or_default()
                    .observe(call, exit_speed, self.weak_contact_exit_speed);
            }
        }

        AggregateSnapshot {
            pitcher: context.pitcher.clone(),
            total_pitches: overall.total,
            strike_rate: ratio(overall.strikes, overall.total),
            swing_rate: ratio(overall.swings, overall.total),
            whiff_rate: ratio(overall.whiffs, overall.swings),
            chase_rate: ratio(chases, outside),
            zone_rate: ratio(in_zone, located),
            contact_rate: ratio(overall.contact, overall.swings),
            hard_hit_rate: ratio(overall.hard_hit, overall.in_play),
            by_pitch_type: by_type
                .into_iter()
                .map(|(label, row)| PitchTypeSummary {
                    pitch_type: label.to_string(),
                    count: row.tally.total,
                    avg_speed: row.speed.mean(),
                    avg_spin: row.spin.mean(),
                    strike_rate: ratio(row.tally.strikes, row.tally.total),
                    swing_rate: ratio(row.tally.swings, row.tally.total),
                    whiff_rate: ratio(row.tally.whiffs, row.tally.swings),
                    contact_rate: ratio(row.tally.contact, row.tally.swings),
                    hard_hit_rate: ratio(row.tally.hard_hit, row.tally.in_play),
                })
                .collect(),
            heat_map: cells
                .into_iter()
                .map(|((row, col), cell)| cell.finish(row, col))
                .collect(),
        }
    }
}

fn outcome_for<'a>(
    pitch: &NormalizedPitch,
    outcomes: &'a HashMap<String, PitchOutcome>,
) -> Option<&'a PitchOutcome> {
    pitch.play_id.as_ref().and_then(|id| outcomes.get(id))
}

/// `numerator / denominator`, 0 when the denominator is empty
fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[derive(Debug, Default)]
struct Tally {
    total: usize,
    strikes: usize,
    swings: usize,
    whiffs: usize,
    contact: usize,
    in_play: usize,
    hard_hit: usize,
}

impl Tally {
    fn observe(&mut self, call: Option<PitchCall>, exit_speed: Option<f64>, hard_hit: f64) {
        self.total += 1;
        let Some(call) = call else {
            return;
        };
        if call.is_strike_equivalent() {
            self.strikes += 1;
        }
        if call.is_swing() {
            self.swings += 1;
        }
        if call == PitchCall::SwingingStrike {
            self.whiffs += 1;
        }
        if call.is_contact() {
            self.contact += 1;
        }
        if call.is_in_play() {
            self.in_play += 1;
            if exit_speed.map_or(false, |speed| speed >= hard_hit) {
                self.hard_hit += 1;
            }
        }
    }
}

#[derive(Debug, Default)]
struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    fn observe(&mut self, value: Option<f64>) {
        if let Some(value) = value {
            self.sum += value;
            self.count += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

#[derive(Debug, Default)]
struct TypeTally {
    tally: Tally,
    speed: Mean,
    spin: Mean,
}

#[derive(Debug, Default)]
struct CellTally {
    total: usize,
    swinging: usize,
    called: usize,
    in_play: usize,
    weak: usize,
}

impl CellTally {
    fn observe(&mut self, call: Option<PitchCall>, exit_speed: Option<f64>, weak_below: f64) {
        self.total += 1;
        match call {
            Some(PitchCall::SwingingStrike) => self.swinging += 1,
            Some(PitchCall::StrikeCalled) => self.called += 1,
            Some(call) if call.is_in_play() => {
                self.in_play += 1;
                // Missing exit speed is not weak contact
                if exit_speed.map_or(false, |speed| speed < weak_below) {
                    self.weak += 1;
                }
            }
            _ => {}
        }
    }

    fn finish(self, row: usize, col: usize) -> ZoneCell {
        let total = self.total as f64;
        let weak_share = if self.in_play == 0 {
            0.0
        } else {
            self.weak as f64 / self.in_play as f64
        };
        let penalty = SWINGING_WEIGHT * (self.swinging as f64 / total)
            + CALLED_WEIGHT * (self.called as f64 / total)
            + WEAK_CONTACT_WEIGHT * weak_share;

        ZoneCell {
            row,
            col,
            total: self.total,
            swinging_strikes: self.swinging,
            called_strikes: self.called,
            balls_in_play: self.in_play,
            weak_contact: self.weak,
            success_score: 1.0 - penalty,
        }
    }
}

#[cfg(test)]
#[path = "aggregation_tests.rs"]
mod tests;
