//! Configuration management for the live pitch session
//!
//! This module provides runtime configuration loading from JSON files so
//! the listening port, buffer capacity and zone geometry can be adjusted per
//! venue without recompilation. Every section falls back to defaults when
//! absent, so a config file only needs the values it overrides.

use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub listener: ListenerConfig,
    pub buffer: BufferConfig,
    pub strike_zone: StrikeZoneConfig,
    pub heat_map: ZoneGridConfig,
    pub aggregation: AggregationConfig,
    pub classifier: ClassifierConfig,
}

/// UDP listener parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind; all interfaces by default so broadcasts arrive
    pub bind_address: String,
    /// UDP port the tracking unit broadcasts on
    pub port: u16,
    /// Size of the datagram receive buffer in bytes
    pub recv_buffer_bytes: usize,
    /// Receive timeout; bounds how long `stop()` can take
    pub read_timeout_ms: u64,
    /// Capacity of the listener → buffer worker queue
    pub queue_capacity: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 20998,
            recv_buffer_bytes: 16384,
            read_timeout_ms: 1000,
            queue_capacity: 256,
        }
    }
}

impl ListenerConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms.max(1))
    }

    /// Resolve `bind_address:port`, falling back to all interfaces when the
    /// configured address does not parse.
    pub fn socket_addr(&self) -> SocketAddr {
        match format!("{}:{}", self.bind_address, self.port).parse() {
            Ok(addr) => addr,
            Err(err) => {
                log::warn!(
                    "[Config] Invalid bind address {:?}: {}. Using 0.0.0.0.",
                    self.bind_address,
                    err
                );
                SocketAddr::from(([0, 0, 0, 0], self.port))
            }
        }
    }
}

/// Ring buffer parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Maximum number of pitches retained; oldest evicted first
    pub capacity: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self { capacity: 500 }
    }
}

/// Strike zone rectangle in plate coordinates (feet), inclusive bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrikeZoneConfig {
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
    pub top: f64,
}

impl Default for StrikeZoneConfig {
    fn default() -> Self {
        Self {
            left: -0.83,
            right: 0.83,
            bottom: 1.5,
            top: 3.5,
        }
    }
}

/// Heat-map grid geometry. The grid is always 3×3; only its origin and cell
/// size are configurable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneGridConfig {
    /// Left edge of column 0 (plate side, feet)
    pub left: f64,
    /// Bottom edge of row 0 (plate height, feet)
    pub bottom: f64,
    pub cell_width: f64,
    pub cell_height: f64,
}

impl Default for ZoneGridConfig {
    fn default() -> Self {
        // Centred on the default strike zone: 3 × 0.57 wide, 3 × 0.6 tall
        Self {
            left: -0.855,
            bottom: 1.6,
            cell_width: 0.57,
            cell_height: 0.6,
        }
    }
}

/// Aggregation schedule and contact thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    pub refresh_interval_ms: u64,
    /// Balls in play below this exit speed (mph) count as weak contact
    pub weak_contact_exit_speed: f64,
    /// Balls in play at or above this exit speed (mph) count as hard hit
    pub hard_hit_exit_speed: f64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 200,
            weak_contact_exit_speed: 85.0,
            hard_hit_exit_speed: 95.0,
        }
    }
}

impl AggregationConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms.max(1))
    }
}

/// Classification model location
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Centroid model JSON; pitches are labelled "Unknown" when unset
    pub model_path: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The loaded configuration, or the defaults if the file is missing or
    /// its JSON is invalid (a warning is logged either way).
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the default location
    pub fn load() -> Self {
        Self::load_from_file("assets/live_pitch_config.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.listener.port, 20998);
        assert_eq!(config.listener.recv_buffer_bytes, 16384);
        assert_eq!(config.buffer.capacity, 500);
        assert_eq!(config.strike_zone.left, -0.83);
        assert_eq!(config.heat_map.cell_width, 0.57);
        assert_eq!(config.heat_map.cell_height, 0.6);
        assert_eq!(config.aggregation.refresh_interval_ms, 200);
        assert!(config.classifier.model_path.is_none());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = AppConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"listener": {{"port": 30000}}, "buffer": {{"capacity": 50}}}}"#).unwrap();

        let config = AppConfig::load_from_file(file.path());
        assert_eq!(config.listener.port, 30000);
        assert_eq!(config.listener.bind_address, "0.0.0.0");
        assert_eq!(config.buffer.capacity, 50);
        assert_eq!(config.strike_zone, StrikeZoneConfig::default());
    }

    #[test]
    fn test_invalid_json_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert_eq!(AppConfig::load_from_file(file.path()), AppConfig::default());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from_file(dir.path().join("absent.json"));
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_socket_addr_falls_back_on_bad_address() {
        let listener = ListenerConfig {
            bind_address: "not-an-ip".to_string(),
            port: 4000,
            ..ListenerConfig::default()
        };
        assert_eq!(listener.socket_addr(), SocketAddr::from(([0, 0, 0, 0], 4000)));
    }
}
