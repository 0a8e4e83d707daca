//! Sensor configuration input.
//!
//! Sensor discovery hands each sensor over as a [`SensorConfig`]. Threshold
//! entries arrive untyped ([`RawThreshold`]) and are resolved when the
//! sensor is built; entries with an unknown shape are logged and skipped so
//! one bad entry never takes the sensor down.
//!
//! # Examples
//!
//! ```
//! use sensord_core::config::DaemonConfig;
//!
//! let json = r#"{
//!     "sensors": [{
//!         "name": "P12V",
//!         "path": "/sys/class/hwmon/hwmon1/in1_input",
//!         "scale_factor": 0.0857,
//!         "configuration": "/xyz/openbmc_project/inventory/system/board/ADC_P12V",
//!         "thresholds": [
//!             { "level": "critical", "direction": "high", "value": 13.2 }
//!         ]
//!     }]
//! }"#;
//!
//! let config = DaemonConfig::from_json(json).unwrap();
//! assert_eq!(config.sensors.len(), 1);
//! assert_eq!(config.sensors[0].resolve_thresholds().len(), 1);
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::constants::{
    DEFAULT_MAX_VALUE, DEFAULT_MIN_VALUE, DEFAULT_POLL_INTERVAL_MS, DEFAULT_SCALE_FACTOR,
};
use crate::types::{SensorKind, Threshold, ThresholdDirection, ThresholdLevel, sensor_object_path};
use crate::{Error, Result};

/// Threshold entry as it appears in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawThreshold {
    pub level: String,
    pub direction: String,
    pub value: f64,
}

impl RawThreshold {
    pub fn new(level: impl Into<String>, direction: impl Into<String>, value: f64) -> Self {
        Self {
            level: level.into(),
            direction: direction.into(),
            value,
        }
    }
}

impl TryFrom<&RawThreshold> for Threshold {
    type Error = Error;

    fn try_from(raw: &RawThreshold) -> Result<Self> {
        let level: ThresholdLevel = raw.level.parse()?;
        let direction: ThresholdDirection = raw.direction.parse()?;
        Ok(Threshold::new(level, direction, raw.value))
    }
}

/// Everything needed to build one sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Display name. Spaces are replaced with underscores on the bus.
    pub name: String,

    /// Device file yielding one newline-terminated number per read.
    pub path: PathBuf,

    #[serde(default)]
    pub kind: SensorKind,

    /// Divisor applied after the fixed hardware scale.
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f64,

    #[serde(default = "default_min_value")]
    pub min_value: f64,

    #[serde(default = "default_max_value")]
    pub max_value: f64,

    #[serde(default)]
    pub thresholds: Vec<RawThreshold>,

    /// Identity of the configuration entry, used to route persistence.
    pub configuration: String,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_scale_factor() -> f64 {
    DEFAULT_SCALE_FACTOR
}

fn default_min_value() -> f64 {
    DEFAULT_MIN_VALUE
}

fn default_max_value() -> f64 {
    DEFAULT_MAX_VALUE
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl SensorConfig {
    /// Create a configuration with defaults for everything but identity.
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        configuration: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: SensorKind::default(),
            scale_factor: DEFAULT_SCALE_FACTOR,
            min_value: DEFAULT_MIN_VALUE,
            max_value: DEFAULT_MAX_VALUE,
            thresholds: Vec::new(),
            configuration: configuration.into(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }

    pub fn with_kind(mut self, kind: SensorKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    pub fn with_range(mut self, min_value: f64, max_value: f64) -> Self {
        self.min_value = min_value;
        self.max_value = max_value;
        self
    }

    pub fn with_threshold(mut self, threshold: RawThreshold) -> Self {
        self.thresholds.push(threshold);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn object_path(&self) -> String {
        sensor_object_path(self.kind, &self.name)
    }

    /// Check the values that would make the pipeline meaningless.
    pub fn validate(&self) -> Result<()> {
        if !self.scale_factor.is_finite() || self.scale_factor == 0.0 {
            return Err(Error::InvalidScaleFactor(self.scale_factor));
        }
        if !(self.min_value <= self.max_value) {
            return Err(Error::InvalidRange {
                min: self.min_value,
                max: self.max_value,
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(Error::Config(format!(
                "sensor {} has a zero poll interval",
                self.name
            )));
        }
        Ok(())
    }

    /// Resolve the configured thresholds into typed entries.
    ///
    /// Unknown levels or directions and repeated `(level, direction)` pairs
    /// are logged and dropped; the first entry for a pair wins.
    pub fn resolve_thresholds(&self) -> Vec<Threshold> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::with_capacity(self.thresholds.len());

        for raw in &self.thresholds {
            let threshold = match Threshold::try_from(raw) {
                Ok(threshold) => threshold,
                Err(e) => {
                    error!(sensor = %self.name, error = %e, "Skipping unknown threshold");
                    continue;
                }
            };

            if !seen.insert(threshold.key()) {
                let e = Error::DuplicateThreshold(threshold.key().to_string());
                error!(sensor = %self.name, error = %e, "Skipping duplicate threshold");
                continue;
            }

            resolved.push(threshold);
        }

        resolved
    }
}

/// Top-level daemon configuration: the set of sensors to run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub sensors: Vec<SensorConfig>,
}

impl DaemonConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn base_config() -> SensorConfig {
        SensorConfig::new("P12V", "/sys/class/hwmon/hwmon1/in1_input", "cfg/P12V")
    }

    #[test]
    fn test_defaults_from_json() {
        let config: SensorConfig = serde_json::from_str(
            r#"{ "name": "P5V", "path": "/dev/null", "configuration": "cfg/P5V" }"#,
        )
        .unwrap();

        assert_eq!(config.kind, SensorKind::Voltage);
        assert_eq!(config.scale_factor, DEFAULT_SCALE_FACTOR);
        assert_eq!(config.min_value, DEFAULT_MIN_VALUE);
        assert_eq!(config.max_value, DEFAULT_MAX_VALUE);
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
        assert!(config.thresholds.is_empty());
    }

    #[test]
    fn test_resolve_skips_unknown_shapes() {
        let config = base_config()
            .with_threshold(RawThreshold::new("warning", "high", 13.0))
            .with_threshold(RawThreshold::new("fatal", "high", 14.0))
            .with_threshold(RawThreshold::new("critical", "up", 15.0))
            .with_threshold(RawThreshold::new("critical", "low", 10.0));

        let thresholds = config.resolve_thresholds();

        assert_eq!(thresholds.len(), 2);
        assert_eq!(thresholds[0].level, ThresholdLevel::Warning);
        assert_eq!(thresholds[1].direction, ThresholdDirection::Low);
    }

    #[test]
    fn test_resolve_keeps_first_duplicate() {
        let config = base_config()
            .with_threshold(RawThreshold::new("warning", "high", 13.0))
            .with_threshold(RawThreshold::new("Warning", "greater than", 99.0));

        let thresholds = config.resolve_thresholds();

        assert_eq!(thresholds.len(), 1);
        assert_eq!(thresholds[0].value, 13.0);
    }

    #[test]
    fn test_validate_rejects_zero_scale_factor() {
        let err = base_config().with_scale_factor(0.0).validate().unwrap_err();
        assert!(matches!(err, Error::InvalidScaleFactor(_)));
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let err = base_config().with_range(5.0, 1.0).validate().unwrap_err();
        assert!(matches!(err, Error::InvalidRange { .. }));
    }

    #[test]
    fn test_validate_rejects_nan_range() {
        let err = base_config().with_range(f64::NAN, 1.0).validate().unwrap_err();
        assert!(matches!(err, Error::InvalidRange { .. }));
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_validate_accepts_equal_bounds() {
        assert!(base_config().with_range(5.0, 5.0).validate().is_ok());
    }

    #[test]
    fn test_poll_interval_saturates() {
        let config = base_config().with_poll_interval(Duration::MAX);
        assert_eq!(config.poll_interval_ms, u64::MAX);
    }

    #[test]
    fn test_object_path_escapes_name() {
        let config = SensorConfig::new("P3V3 AUX", "/dev/null", "cfg");
        assert_eq!(
            config.object_path(),
            "/xyz/openbmc_project/sensors/voltage/P3V3_AUX"
        );
    }

    #[test]
    fn test_object_path_follows_kind() {
        let config = base_config().with_kind(SensorKind::Temperature);
        assert_eq!(
            config.object_path(),
            "/xyz/openbmc_project/sensors/temperature/P12V"
        );
    }

    #[test]
    fn test_daemon_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "sensors": [ {{ "name": "VBAT", "path": "/dev/null", "configuration": "cfg/VBAT", "kind": "voltage" }} ] }}"#
        )
        .unwrap();

        let config = DaemonConfig::from_file(file.path()).unwrap();
        assert_eq!(config.sensors.len(), 1);
        assert_eq!(config.sensors[0].name, "VBAT");
    }

    #[test]
    fn test_daemon_config_invalid_json() {
        let err = DaemonConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }
}
