use super::*;
use crate::context::PitchCategory;

fn context(pitcher: &str) -> SessionContext {
    SessionContext {
        pitcher: pitcher.to_string(),
        team: "Owls".to_string(),
        category: PitchCategory::Live,
    }
}

fn pitch(id: &str, label: &str, speed: f64, side: Option<f64>, height: Option<f64>) -> NormalizedPitch {
    let mut pitch = NormalizedPitch::new("Ace", "Owls");
    pitch.play_id = Some(id.to_string());
    pitch.pitch_type = label.to_string();
    pitch.pitch_speed = Some(speed);
    pitch.plate_loc_side = side;
    pitch.plate_loc_height = height;
    pitch
}

fn outcomes(entries: &[(&str, PitchOutcome)]) -> HashMap<String, PitchOutcome> {
    entries
        .iter()
        .map(|(id, outcome)| (id.to_string(), outcome.clone()))
        .collect()
}

fn aggregator() -> LiveAggregator {
    LiveAggregator::new(&AppConfig::default())
}

#[test]
fn test_empty_buffer_gives_zero_rates() {
    let snapshot = aggregator().compute(&[], &context("Ace"), &HashMap::new());
    assert_eq!(snapshot, AggregateSnapshot::empty("Ace"));
}

#[test]
fn test_recomputing_same_snapshot_is_identical() {
    let pitches = vec![
        pitch("1", "Fastball", 93.2, Some(0.1), Some(2.4)),
        pitch("2", "Slider", 84.7, Some(1.2), Some(1.1)),
        pitch("3", "Fastball", 94.0, Some(-0.5), Some(3.0)),
    ];
    let ledger = outcomes(&[
        ("1", PitchOutcome::called(PitchCall::StrikeCalled)),
        ("2", PitchOutcome::called(PitchCall::SwingingStrike)),
        ("3", PitchOutcome::in_play(PitchCall::InPlayOut, 80.0)),
    ]);
    let aggregator = aggregator();
    let first = aggregator.compute(&pitches, &context("Ace"), &ledger);
    let second = aggregator.compute(&pitches, &context("Ace"), &ledger);
    assert_eq!(first, second);
}

#[test]
fn test_no_swings_gives_zero_whiff_rate() {
    let pitches = vec![
        pitch("1", "Fastball", 93.0, Some(0.0), Some(2.5)),
        pitch("2", "Fastball", 92.0, Some(0.0), Some(2.5)),
    ];
    let ledger = outcomes(&[
        ("1", PitchOutcome::called(PitchCall::StrikeCalled)),
        ("2", PitchOutcome::called(PitchCall::BallCalled)),
    ]);
    let snapshot = aggregator().compute(&pitches, &context("Ace"), &ledger);
    assert_eq!(snapshot.whiff_rate, 0.0);
    assert_eq!(snapshot.swing_rate, 0.0);
    assert_eq!(snapshot.contact_rate, 0.0);
    assert_eq!(snapshot.strike_rate, 0.5);
}

#[test]
fn test_nothing_outside_zone_gives_zero_chase_rate() {
    let pitches = vec![pitch("1", "Fastball", 93.0, Some(0.0), Some(2.5))];
    let ledger = outcomes(&[("1", PitchOutcome::called(PitchCall::SwingingStrike))]);
    let snapshot = aggregator().compute(&pitches, &context("Ace"), &ledger);
    assert_eq!(snapshot.chase_rate, 0.0);
    assert_eq!(snapshot.zone_rate, 1.0);
}

#[test]
fn test_single_swinging_strike_cell_scores_point_six() {
    let pitches = vec![pitch("1", "Fastball", 93.0, Some(0.0), Some(2.5))];
    let ledger = outcomes(&[("1", PitchOutcome::called(PitchCall::SwingingStrike))]);
    let snapshot = aggregator().compute(&pitches, &context("Ace"), &ledger);

    assert_eq!(snapshot.heat_map.len(), 1);
    let cell = &snapshot.heat_map[0];
    assert_eq!((cell.row, cell.col), (1, 1));
    assert_eq!(cell.total, 1);
    assert_eq!(cell.swinging_strikes, 1);
    assert_eq!(cell.success_score, 0.6);
}

#[test]
fn test_rates_over_mixed_outcomes() {
    let pitches = vec![
        // in zone
        pitch("1", "Fastball", 95.0, Some(0.0), Some(2.5)),
        pitch("2", "Fastball", 96.0, Some(0.3), Some(2.0)),
        // outside zone
        pitch("3", "Slider", 85.0, Some(1.3), Some(1.0)),
        pitch("4", "Slider", 86.0, Some(-1.2), Some(3.9)),
        // no location
        pitch("5", "Changeup", 82.0, None, None),
    ];
    let ledger = outcomes(&[
        ("1", PitchOutcome::in_play(PitchCall::InPlayHit, 101.0)),
        ("2", PitchOutcome::called(PitchCall::FoulBall)),
        ("3", PitchOutcome::called(PitchCall::SwingingStrike)),
        ("4", PitchOutcome::called(PitchCall::BallCalled)),
        ("5", PitchOutcome::in_play(PitchCall::InPlayOut, 70.0)),
    ]);
    let snapshot = aggregator().compute(&pitches, &context("Ace"), &ledger);

    assert_eq!(snapshot.total_pitches, 5);
    // strikes: 1, 2, 3, 5
    assert_eq!(snapshot.strike_rate, 4.0 / 5.0);
    // swings: 1, 2, 3, 5; whiffs: 3
    assert_eq!(snapshot.swing_rate, 4.0 / 5.0);
    assert_eq!(snapshot.whiff_rate, 1.0 / 4.0);
    assert_eq!(snapshot.contact_rate, 3.0 / 4.0);
    // outside: 3, 4; chased: 3
    assert_eq!(snapshot.chase_rate, 0.5);
    assert_eq!(snapshot.zone_rate, 0.5);
    // in play: 1 (101 mph), 5 (70 mph)
    assert_eq!(snapshot.hard_hit_rate, 0.5);
}

#[test]
fn test_pitch_type_rows_carry_swing_contact_and_hard_hit_rates() {
    let pitches = vec![
        pitch("1", "Fastball", 95.0, Some(0.0), Some(2.5)),
        pitch("2", "Fastball", 96.0, Some(0.0), Some(2.5)),
        pitch("3", "Fastball", 94.0, Some(0.0), Some(2.5)),
        pitch("4", "Fastball", 93.0, Some(0.0), Some(2.5)),
        pitch("5", "Slider", 85.0, Some(1.3), Some(1.0)),
        pitch("6", "Slider", 84.0, Some(1.3), Some(1.0)),
    ];
    let ledger = outcomes(&[
        ("1", PitchOutcome::in_play(PitchCall::InPlayHit, 102.0)),
        ("2", PitchOutcome::in_play(PitchCall::InPlayOut, 80.0)),
        ("3", PitchOutcome::called(PitchCall::SwingingStrike)),
        ("4", PitchOutcome::called(PitchCall::BallCalled)),
        ("5", PitchOutcome::called(PitchCall::SwingingStrike)),
        ("6", PitchOutcome::called(PitchCall::BallCalled)),
    ]);
    let snapshot = aggregator().compute(&pitches, &context("Ace"), &ledger);
    assert_eq!(snapshot.swing_rate, 4.0 / 6.0);

    let fastball = &snapshot.by_pitch_type[0];
    assert_eq!(fastball.pitch_type, "Fastball");
    // swings: 1, 2, 3; contact: 1, 2; in play: 1 (hard), 2
    assert_eq!(fastball.swing_rate, 3.0 / 4.0);
    assert_eq!(fastball.contact_rate, 2.0 / 3.0);
    assert_eq!(fastball.hard_hit_rate, 0.5);

    let slider = &snapshot.by_pitch_type[1];
    assert_eq!(slider.swing_rate, 0.5);
    assert_eq!(slider.contact_rate, 0.0);
    assert_eq!(slider.whiff_rate, 1.0);
    // No balls in play
    assert_eq!(slider.hard_hit_rate, 0.0);
}

#[test]
fn test_pitch_type_rows_are_sorted_with_means() {
    let mut slow = pitch("3", "Changeup", 82.0, None, None);
    slow.spin_rate = Some(1700.0);
    let pitches = vec![
        pitch("1", "Fastball", 94.0, None, None),
        pitch("2", "Fastball", 92.0, None, None),
        slow,
    ];
    let snapshot = aggregator().compute(&pitches, &context("Ace"), &HashMap::new());

    let labels: Vec<&str> = snapshot
        .by_pitch_type
        .iter()
        .map(|row| row.pitch_type.as_str())
        .collect();
    assert_eq!(labels, vec!["Changeup", "Fastball"]);

    let fastball = &snapshot.by_pitch_type[1];
    assert_eq!(fastball.count, 2);
    assert_eq!(fastball.avg_speed, Some(93.0));
    assert_eq!(fastball.avg_spin, None);
    assert_eq!(snapshot.by_pitch_type[0].avg_spin, Some(1700.0));
}

#[test]
fn test_other_pitchers_and_discards_are_excluded() {
    let mut other = pitch("2", "Fastball", 90.0, Some(0.0), Some(2.5));
    other.pitcher = "Relief".to_string();
    let pitches = vec![
        pitch("1", "Fastball", 93.0, Some(0.0), Some(2.5)),
        other,
        pitch("3", "Fastball", 91.0, Some(0.0), Some(2.5)),
    ];
    let mut discarded = PitchOutcome::called(PitchCall::BallCalled);
    discarded.discard = true;
    let ledger = outcomes(&[("3", discarded)]);

    let snapshot = aggregator().compute(&pitches, &context("Ace"), &ledger);
    assert_eq!(snapshot.total_pitches, 1);
    assert_eq!(snapshot.heat_map[0].total, 1);

    let relief = aggregator().compute(&pitches, &context("Relief"), &ledger);
    assert_eq!(relief.total_pitches, 1);
    assert_eq!(relief.pitcher, "Relief");
}

#[test]
fn test_heat_map_weak_contact_and_ordering() {
    let pitches = vec![
        pitch("1", "Fastball", 93.0, Some(0.5), Some(3.0)),
        pitch("2", "Fastball", 93.0, Some(0.5), Some(3.0)),
        pitch("3", "Fastball", 93.0, Some(0.5), Some(3.0)),
        pitch("4", "Fastball", 93.0, Some(-0.5), Some(1.8)),
        // off the grid entirely
        pitch("5", "Fastball", 93.0, Some(2.0), Some(0.5)),
    ];
    let ledger = outcomes(&[
        ("1", PitchOutcome::in_play(PitchCall::InPlayOut, 70.0)),
        ("2", PitchOutcome::called(PitchCall::InPlayHit)),
        ("3", PitchOutcome::called(PitchCall::StrikeCalled)),
    ]);
    let snapshot = aggregator().compute(&pitches, &context("Ace"), &ledger);

    let positions: Vec<(usize, usize)> = snapshot.heat_map.iter().map(|c| (c.row, c.col)).collect();
    assert_eq!(positions, vec![(0, 0), (2, 2)]);

    let low = &snapshot.heat_map[0];
    assert_eq!(low.total, 1);
    assert_eq!(low.success_score, 1.0);

    let high = &snapshot.heat_map[1];
    assert_eq!(high.total, 3);
    assert_eq!(high.balls_in_play, 2);
    // Missing exit speed is not weak
    assert_eq!(high.weak_contact, 1);
    assert_eq!(high.called_strikes, 1);
    let expected = 1.0 - (0.3 * (1.0 / 3.0) + 0.3 * 0.5);
    assert!((high.success_score - expected).abs() < 1e-12);
}
