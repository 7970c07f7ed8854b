//! Wire shape of a tracking-unit datagram.
//!
//! Only the fields the pipeline consumes are modelled; everything else in
//! the payload (NineP, approach angles, hit data) is ignored.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Message kind that carries a pitch
pub const PITCH_KIND: &str = "Pitch";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawMessage {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub play_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub time: Option<String>,
    #[serde(default)]
    pub pitch: Option<RawPitch>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawPitch {
    #[serde(default, deserialize_with = "lenient_number")]
    pub speed: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub zone_speed: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub spin_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub spin_axis: Option<f64>,
    /// Clock-face notation, e.g. "1:30"; kept raw so a malformed value only
    /// loses the tilt, not the pitch
    #[serde(default)]
    pub tilt: Option<Value>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub release: RawRelease,
    #[serde(default, deserialize_with = "lenient_object")]
    pub movement: RawMovement,
    #[serde(default, deserialize_with = "lenient_object")]
    pub location: RawLocation,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawRelease {
    #[serde(default, deserialize_with = "lenient_number")]
    pub extension: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub height: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub side: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub vertical_angle: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub horizontal_angle: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawMovement {
    #[serde(default, deserialize_with = "lenient_number")]
    pub horizontal: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub vertical: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub induced_vertical: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawLocation {
    #[serde(default, deserialize_with = "lenient_number")]
    pub height: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub side: Option<f64>,
}

/// Kind field of an undecoded message, if it is a string.
pub fn message_kind(message: &Value) -> Option<&str> {
    message.get("Kind").and_then(Value::as_str)
}

/// Accept a JSON number or a numeric string; anything else is absent.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => number.as_f64().filter(|v| v.is_finite()),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    })
}

/// Identifier given as a string or a number; a number keeps its JSON form.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}

/// A string field of any other JSON type is absent.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => Some(text),
        _ => None,
    })
}

/// A sub-object that is `null` or not an object decodes as empty.
fn lenient_object<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + serde::de::DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(object @ Value::Object(_)) => serde_json::from_value(object).unwrap_or_default(),
        _ => T::default(),
    })
}
