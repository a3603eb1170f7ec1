//! Configuration loading and typed config structures for the Crossroads
//! controller.
//!
//! The canonical configuration lives in `crossroads-config.yaml` at the
//! project root. This module defines strongly-typed structs that mirror the
//! YAML structure, and provides a loader that reads the file. Semantic
//! validation (pair partitioning, positive durations) happens when the
//! scheduler is built, see [`crate::layout`] and [`crate::phase`].

use std::path::Path;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level controller configuration.
///
/// Mirrors the structure of `crossroads-config.yaml`. All fields have
/// defaults matching a standard four-way intersection.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ControllerConfig {
    /// Lane pairing.
    #[serde(default)]
    pub intersection: IntersectionConfig,

    /// Phase durations and polling cadence.
    #[serde(default)]
    pub timing: TimingConfig,

    /// Where lane occupancy comes from.
    #[serde(default)]
    pub occupancy: OccupancyConfig,

    /// Observer HTTP server settings.
    #[serde(default)]
    pub observer: ObserverConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Run boundaries.
    #[serde(default)]
    pub simulation: SimulationBoundsConfig,
}

impl ControllerConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `CROSSROADS_OBSERVER_PORT` overrides `observer.port`
    /// - `CROSSROADS_LOG_LEVEL` overrides `logging.level`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// An empty document yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }

    /// Override selected values with environment variables when set.
    ///
    /// Unparseable values are ignored so a bad variable never prevents
    /// startup.
    pub fn apply_env_overrides(&mut self) {
        if let Some(port) = std::env::var("CROSSROADS_OBSERVER_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
        {
            self.observer.port = port;
        }
        if let Ok(level) = std::env::var("CROSSROADS_LOG_LEVEL") {
            self.logging.level = level;
        }
    }
}

/// Lane pairing for the intersection.
///
/// The two pairs must partition lanes 1-4 into two disjoint two-lane
/// groups. Each adjacency conflict couples a lane of one pair with a lane
/// of the other; the first lane listed wins ties.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IntersectionConfig {
    /// Human-readable intersection name (used in logs and the dashboard).
    #[serde(default = "default_intersection_name")]
    pub name: String,

    /// Lanes of pair A.
    #[serde(default = "default_pair_a")]
    pub pair_a: (u8, u8),

    /// Lanes of pair B.
    #[serde(default = "default_pair_b")]
    pub pair_b: (u8, u8),

    /// Adjacent lanes from different pairs that contend directly, in
    /// evaluation order.
    #[serde(default = "default_adjacent_conflicts")]
    pub adjacent_conflicts: Vec<(u8, u8)>,
}

impl Default for IntersectionConfig {
    fn default() -> Self {
        Self {
            name: default_intersection_name(),
            pair_a: default_pair_a(),
            pair_b: default_pair_b(),
            adjacent_conflicts: default_adjacent_conflicts(),
        }
    }
}

/// Phase durations and polling cadence.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimingConfig {
    /// How long a selection stays green, in seconds.
    #[serde(default = "default_green_duration_seconds")]
    pub green_duration_seconds: f64,

    /// How long a selection stays yellow, in seconds.
    #[serde(default = "default_yellow_duration_seconds")]
    pub yellow_duration_seconds: f64,

    /// Delay between occupancy polls (one tick per poll).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            green_duration_seconds: default_green_duration_seconds(),
            yellow_duration_seconds: default_yellow_duration_seconds(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Occupancy source selection and parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OccupancyConfig {
    /// Source kind: `none`, `random`, or `scripted`.
    #[serde(default = "default_occupancy_source")]
    pub source: String,

    /// Seed for the random arrival generator.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Probability that a vehicle arrives in an empty lane on a given poll.
    #[serde(default = "default_arrival_probability")]
    pub arrival_probability: f64,

    /// Shortest time a simulated vehicle stays in its lane, in seconds.
    #[serde(default = "default_min_dwell_seconds")]
    pub min_dwell_seconds: f64,

    /// Longest time a simulated vehicle stays in its lane, in seconds.
    #[serde(default = "default_max_dwell_seconds")]
    pub max_dwell_seconds: f64,

    /// Occupancy windows for the scripted source.
    #[serde(default)]
    pub script: Vec<OccupancyWindowConfig>,
}

impl Default for OccupancyConfig {
    fn default() -> Self {
        Self {
            source: default_occupancy_source(),
            seed: default_seed(),
            arrival_probability: default_arrival_probability(),
            min_dwell_seconds: default_min_dwell_seconds(),
            max_dwell_seconds: default_max_dwell_seconds(),
            script: Vec::new(),
        }
    }
}

/// A scripted interval during which some lanes report a vehicle.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OccupancyWindowConfig {
    /// Raw lane ids occupied during the window.
    pub lanes: Vec<u8>,
    /// Window start (inclusive), seconds since controller start.
    pub from_seconds: f64,
    /// Window end (exclusive), seconds since controller start.
    pub until_seconds: f64,
}

/// Observer HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObserverConfig {
    /// Whether the observer server is started.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Host address to bind.
    #[serde(default = "default_observer_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_observer_port")]
    pub port: u16,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_observer_host(),
            port: default_observer_port(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error), used when `RUST_LOG`
    /// is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Run boundary configuration.
///
/// A value of 0 for either field means unlimited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SimulationBoundsConfig {
    /// Maximum number of ticks before the control loop ends (0 = unlimited).
    #[serde(default)]
    pub max_ticks: u64,

    /// Maximum wall-clock seconds before the control loop ends (0 = unlimited).
    #[serde(default)]
    pub max_real_time_seconds: u64,
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_intersection_name() -> String {
    "Crossroads".to_owned()
}

const fn default_pair_a() -> (u8, u8) {
    (1, 3)
}

const fn default_pair_b() -> (u8, u8) {
    (2, 4)
}

fn default_adjacent_conflicts() -> Vec<(u8, u8)> {
    vec![(1, 2), (3, 4)]
}

const fn default_green_duration_seconds() -> f64 {
    15.0
}

const fn default_yellow_duration_seconds() -> f64 {
    3.0
}

const fn default_poll_interval_ms() -> u64 {
    100
}

fn default_occupancy_source() -> String {
    "random".to_owned()
}

const fn default_seed() -> u64 {
    42
}

const fn default_arrival_probability() -> f64 {
    0.02
}

const fn default_min_dwell_seconds() -> f64 {
    2.0
}

const fn default_max_dwell_seconds() -> f64 {
    20.0
}

fn default_observer_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_observer_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_standard_intersection() {
        let config = ControllerConfig::default();
        assert_eq!(config.intersection.pair_a, (1, 3));
        assert_eq!(config.intersection.pair_b, (2, 4));
        assert_eq!(config.intersection.adjacent_conflicts, vec![(1, 2), (3, 4)]);
        assert_eq!(config.timing.poll_interval_ms, 100);
        assert_eq!(config.observer.port, 8080);
        assert_eq!(config.simulation.max_ticks, 0);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
intersection:
  name: "Main & 5th"
  pair_a: [1, 3]
  pair_b: [2, 4]
  adjacent_conflicts:
    - [1, 2]
    - [3, 4]

timing:
  green_duration_seconds: 10.5
  yellow_duration_seconds: 2.5
  poll_interval_ms: 50

occupancy:
  source: scripted
  seed: 7
  script:
    - lanes: [1]
      from_seconds: 0.0
      until_seconds: 30.0
    - lanes: [2, 4]
      from_seconds: 5.0
      until_seconds: 8.0

observer:
  enabled: false
  host: "127.0.0.1"
  port: 9090

logging:
  level: "debug"

simulation:
  max_ticks: 500
  max_real_time_seconds: 60
"#;

        let config = ControllerConfig::parse(yaml).unwrap();

        assert_eq!(config.intersection.name, "Main & 5th");
        assert_eq!(config.timing.poll_interval_ms, 50);
        assert!((config.timing.green_duration_seconds - 10.5).abs() < f64::EPSILON);
        assert_eq!(config.occupancy.source, "scripted");
        assert_eq!(config.occupancy.script.len(), 2);
        assert_eq!(config.occupancy.script[1].lanes, vec![2, 4]);
        assert!(!config.observer.enabled);
        assert_eq!(config.observer.port, 9090);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.simulation.max_ticks, 500);
    }

    #[test]
    fn parse_minimal_yaml() {
        let yaml = "timing:\n  green_duration_seconds: 20\n";
        let config = ControllerConfig::parse(yaml).unwrap();

        // Green is overridden
        assert!((config.timing.green_duration_seconds - 20.0).abs() < f64::EPSILON);
        // Everything else uses defaults
        assert!((config.timing.yellow_duration_seconds - 3.0).abs() < f64::EPSILON);
        assert_eq!(config.intersection.pair_a, (1, 3));
        assert_eq!(config.occupancy.source, "random");
    }

    #[test]
    fn parse_empty_yaml() {
        let config = ControllerConfig::parse("").unwrap();
        assert_eq!(config, ControllerConfig::default());
    }

    #[test]
    fn parse_rejects_malformed_yaml() {
        let result = ControllerConfig::parse("timing: [unclosed");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = ControllerConfig::from_file(Path::new("/nonexistent/crossroads.yaml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("crossroads-config.yaml");
        if path.exists() {
            let config = ControllerConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
