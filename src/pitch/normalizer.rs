// Normalizer - flattens a nested telemetry message into a NormalizedPitch
//
// Missing sub-objects (Release, Movement, Location) decode as empty and only
// leave their fields absent. The one hard requirement is the Pitch object
// itself: without it there is nothing to buffer, and the caller drops the
// datagram.

use chrono::{DateTime, NaiveDateTime, NaiveTime, Timelike};
use serde::Deserialize;
use serde_json::Value;

use super::message::RawMessage;
use super::NormalizedPitch;
use crate::context::SessionContext;

/// Flatten `message` into a pitch record attributed to the active context.
///
/// # Returns
/// `None` when the message has no `Pitch` object or cannot be decoded at all.
pub fn normalize(message: &Value, context: &SessionContext) -> Option<NormalizedPitch> {
    let raw = match RawMessage::deserialize(message) {
        Ok(raw) => raw,
        Err(err) => {
            log::debug!("[Normalizer] Undecodable pitch message: {}", err);
            return None;
        }
    };
    let pitch = raw.pitch?;

    let mut normalized = NormalizedPitch::new(context.pitcher.clone(), context.team.clone());
    normalized.play_id = raw.play_id;
    normalized.timestamp = raw.time.as_deref().and_then(parse_clock_time);
    normalized.pitch_speed = pitch.speed;
    normalized.zone_speed = pitch.zone_speed;
    normalized.spin_rate = pitch.spin_rate;
    normalized.spin_axis = pitch.spin_axis;
    normalized.tilt_degrees = pitch
        .tilt
        .as_ref()
        .and_then(Value::as_str)
        .and_then(tilt_to_degrees);
    normalized.release_extension = pitch.release.extension;
    normalized.release_height = pitch.release.height;
    normalized.release_side = pitch.release.side;
    normalized.release_vert_angle = pitch.release.vertical_angle;
    normalized.release_horiz_angle = pitch.release.horizontal_angle;
    normalized.movement_horizontal = pitch.movement.horizontal;
    normalized.movement_vertical = pitch.movement.vertical;
    normalized.induced_vertical = pitch.movement.induced_vertical;
    normalized.plate_loc_side = pitch.location.side;
    normalized.plate_loc_height = pitch.location.height;

    Some(normalized)
}

/// Convert clock-face tilt ("H:MM") to degrees on a 360° dial.
///
/// `(H mod 12 + MM / 60) × 30`, so "3:00" is 90° and "12:00" is 0°.
/// Anything that is not exactly two integer parts separated by a colon
/// yields `None`.
pub fn tilt_to_degrees(tilt: &str) -> Option<f64> {
    let (hour, minute) = tilt.trim().split_once(':')?;
    let hour: i64 = hour.trim().parse().ok()?;
    let minute: i64 = minute.trim().parse().ok()?;
    Some((hour.rem_euclid(12) as f64 + minute as f64 / 60.0) * 30.0)
}

/// Time of day of an ISO-8601 timestamp, truncated to whole seconds.
///
/// Accepts RFC 3339 (with `Z` or an explicit offset) and naive date-times
/// separated by `T` or a space.
/// The time is taken in the timestamp's own offset, not converted to UTC.
pub fn parse_clock_time(time: &str) -> Option<NaiveTime> {
    let time = time.trim();
    let local = match DateTime::parse_from_rfc3339(time) {
        Ok(parsed) => parsed.time(),
        Err(_) => NaiveDateTime::parse_from_str(time, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(time, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()?
            .time(),
    };
    local.with_nanosecond(0)
}
