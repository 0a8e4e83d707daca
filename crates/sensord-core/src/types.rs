use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{CRITICAL_INTERFACE, SENSOR_PATH_ROOT, WARNING_INTERFACE};
use crate::{Error, Result};

/// Severity of a threshold.
///
/// Each level owns one property group on the bus, so a sensor exposes the
/// warning interface only when it has at least one warning threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdLevel {
    Warning,
    Critical,
}

impl ThresholdLevel {
    /// Bus interface that holds the properties of this level.
    pub fn interface(&self) -> &'static str {
        match self {
            Self::Warning => WARNING_INTERFACE,
            Self::Critical => CRITICAL_INTERFACE,
        }
    }
}

impl fmt::Display for ThresholdLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "Warning"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

impl FromStr for ThresholdLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warning" => Ok(Self::Warning),
            "critical" => Ok(Self::Critical),
            _ => Err(Error::UnknownThresholdLevel(s.to_string())),
        }
    }
}

/// Which side of the threshold value raises the alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdDirection {
    /// Alarm while the reading is above the threshold.
    High,
    /// Alarm while the reading is below the threshold.
    Low,
}

impl fmt::Display for ThresholdDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "High"),
            Self::Low => write!(f, "Low"),
        }
    }
}

impl FromStr for ThresholdDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" | "greater than" => Ok(Self::High),
            "low" | "less than" => Ok(Self::Low),
            _ => Err(Error::UnknownThresholdDirection(s.to_string())),
        }
    }
}

/// Identity of a threshold within a sensor.
///
/// A sensor holds at most one threshold per key, and the key alone decides
/// which bus properties the threshold is published under.
///
/// # Examples
///
/// ```
/// use sensord_core::{ThresholdDirection, ThresholdKey, ThresholdLevel};
///
/// let key = ThresholdKey::new(ThresholdLevel::Critical, ThresholdDirection::High);
/// assert_eq!(key.value_property(), "CriticalHigh");
/// assert_eq!(key.alarm_property(), "CriticalAlarmHigh");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThresholdKey {
    pub level: ThresholdLevel,
    pub direction: ThresholdDirection,
}

impl ThresholdKey {
    pub const fn new(level: ThresholdLevel, direction: ThresholdDirection) -> Self {
        Self { level, direction }
    }

    /// Writable property carrying the threshold value.
    pub fn value_property(&self) -> &'static str {
        match (self.level, self.direction) {
            (ThresholdLevel::Warning, ThresholdDirection::High) => "WarningHigh",
            (ThresholdLevel::Warning, ThresholdDirection::Low) => "WarningLow",
            (ThresholdLevel::Critical, ThresholdDirection::High) => "CriticalHigh",
            (ThresholdLevel::Critical, ThresholdDirection::Low) => "CriticalLow",
        }
    }

    /// Read-only boolean property reflecting the alarm state.
    pub fn alarm_property(&self) -> &'static str {
        match (self.level, self.direction) {
            (ThresholdLevel::Warning, ThresholdDirection::High) => "WarningAlarmHigh",
            (ThresholdLevel::Warning, ThresholdDirection::Low) => "WarningAlarmLow",
            (ThresholdLevel::Critical, ThresholdDirection::High) => "CriticalAlarmHigh",
            (ThresholdLevel::Critical, ThresholdDirection::Low) => "CriticalAlarmLow",
        }
    }
}

impl fmt::Display for ThresholdKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.level, self.direction)
    }
}

/// A single threshold of a sensor.
///
/// `value` is the crossing point and may be rewritten from the bus. The
/// alarm state is derived from the last reading passed to
/// [`Threshold::assess`] and is never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub level: ThresholdLevel,
    pub direction: ThresholdDirection,
    pub value: f64,
    #[serde(skip)]
    asserted: bool,
}

impl Threshold {
    pub fn new(level: ThresholdLevel, direction: ThresholdDirection, value: f64) -> Self {
        Self {
            level,
            direction,
            value,
            asserted: false,
        }
    }

    pub fn key(&self) -> ThresholdKey {
        ThresholdKey::new(self.level, self.direction)
    }

    /// Whether the alarm is currently raised.
    pub fn is_asserted(&self) -> bool {
        self.asserted
    }

    /// Directional comparison of `reading` against this threshold.
    ///
    /// A NaN reading never crosses.
    ///
    /// ```
    /// use sensord_core::{Threshold, ThresholdDirection, ThresholdLevel};
    ///
    /// let high = Threshold::new(ThresholdLevel::Warning, ThresholdDirection::High, 50.0);
    /// assert!(high.crossed_by(50.1));
    /// assert!(!high.crossed_by(50.0));
    /// ```
    pub fn crossed_by(&self, reading: f64) -> bool {
        match self.direction {
            ThresholdDirection::High => reading > self.value,
            ThresholdDirection::Low => reading < self.value,
        }
    }

    /// Recompute the alarm for `reading`.
    ///
    /// Returns the new state only when it differs from the previous one, so
    /// callers publish exactly the transitions.
    pub fn assess(&mut self, reading: f64) -> Option<bool> {
        let crossed = self.crossed_by(reading);
        if crossed == self.asserted {
            return None;
        }
        self.asserted = crossed;
        Some(crossed)
    }
}

/// Physical quantity measured by a sensor.
///
/// The kind picks the object path segment and the configuration interface
/// that threshold writes are persisted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    #[default]
    Voltage,
    Temperature,
    Fan,
    Current,
    Power,
}

impl SensorKind {
    /// Object path segment under [`SENSOR_PATH_ROOT`].
    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::Voltage => "voltage",
            Self::Temperature => "temperature",
            Self::Fan => "fan_tach",
            Self::Current => "current",
            Self::Power => "power",
        }
    }

    /// Configuration interface used to route persistence requests.
    pub fn configuration_interface(&self) -> &'static str {
        match self {
            Self::Voltage => "xyz.openbmc_project.Configuration.ADC",
            Self::Temperature => "xyz.openbmc_project.Configuration.TMP75",
            Self::Fan => "xyz.openbmc_project.Configuration.AspeedFan",
            Self::Current => "xyz.openbmc_project.Configuration.CurrentSensor",
            Self::Power => "xyz.openbmc_project.Configuration.PowerSensor",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// Bus-safe form of a display name: spaces become underscores.
pub fn escape_name(name: &str) -> String {
    name.replace(' ', "_")
}

/// Object path of a sensor on the property bus.
///
/// ```
/// use sensord_core::{SensorKind, sensor_object_path};
///
/// assert_eq!(
///     sensor_object_path(SensorKind::Voltage, "P3V3 Standby"),
///     "/xyz/openbmc_project/sensors/voltage/P3V3_Standby",
/// );
/// ```
pub fn sensor_object_path(kind: SensorKind, name: &str) -> String {
    format!("{}/{}/{}", SENSOR_PATH_ROOT, kind.path_segment(), escape_name(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Warning", ThresholdLevel::Warning)]
    #[case("critical", ThresholdLevel::Critical)]
    #[case(" CRITICAL ", ThresholdLevel::Critical)]
    fn test_level_from_str(#[case] input: &str, #[case] expected: ThresholdLevel) {
        assert_eq!(input.parse::<ThresholdLevel>().unwrap(), expected);
    }

    #[test]
    fn test_level_from_str_unknown() {
        let err = "fatal".parse::<ThresholdLevel>().unwrap_err();
        assert!(matches!(err, Error::UnknownThresholdLevel(ref s) if s == "fatal"));
    }

    #[rstest]
    #[case("high", ThresholdDirection::High)]
    #[case("greater than", ThresholdDirection::High)]
    #[case("Low", ThresholdDirection::Low)]
    #[case("less than", ThresholdDirection::Low)]
    fn test_direction_from_str(#[case] input: &str, #[case] expected: ThresholdDirection) {
        assert_eq!(input.parse::<ThresholdDirection>().unwrap(), expected);
    }

    #[test]
    fn test_direction_from_str_unknown() {
        assert!("sideways".parse::<ThresholdDirection>().is_err());
    }

    #[rstest]
    #[case(ThresholdLevel::Warning, ThresholdDirection::High, "WarningHigh", "WarningAlarmHigh")]
    #[case(ThresholdLevel::Warning, ThresholdDirection::Low, "WarningLow", "WarningAlarmLow")]
    #[case(ThresholdLevel::Critical, ThresholdDirection::High, "CriticalHigh", "CriticalAlarmHigh")]
    #[case(ThresholdLevel::Critical, ThresholdDirection::Low, "CriticalLow", "CriticalAlarmLow")]
    fn test_key_property_names(
        #[case] level: ThresholdLevel,
        #[case] direction: ThresholdDirection,
        #[case] value_property: &str,
        #[case] alarm_property: &str,
    ) {
        let key = ThresholdKey::new(level, direction);
        assert_eq!(key.value_property(), value_property);
        assert_eq!(key.alarm_property(), alarm_property);
    }

    #[test]
    fn test_level_interface() {
        assert_eq!(ThresholdLevel::Warning.interface(), WARNING_INTERFACE);
        assert_eq!(ThresholdLevel::Critical.interface(), CRITICAL_INTERFACE);
    }

    #[test]
    fn test_assess_reports_only_transitions() {
        let mut threshold = Threshold::new(ThresholdLevel::Warning, ThresholdDirection::High, 50.0);

        assert_eq!(threshold.assess(49.9), None);
        assert_eq!(threshold.assess(50.1), Some(true));
        assert_eq!(threshold.assess(50.1), None);
        assert!(threshold.is_asserted());
        assert_eq!(threshold.assess(10.0), Some(false));
        assert!(!threshold.is_asserted());
    }

    #[test]
    fn test_assess_low_direction() {
        let mut threshold = Threshold::new(ThresholdLevel::Critical, ThresholdDirection::Low, 1.0);

        assert_eq!(threshold.assess(0.5), Some(true));
        assert_eq!(threshold.assess(1.0), Some(false));
    }

    #[test]
    fn test_nan_never_crosses() {
        let high = Threshold::new(ThresholdLevel::Warning, ThresholdDirection::High, 0.0);
        let low = Threshold::new(ThresholdLevel::Warning, ThresholdDirection::Low, 0.0);
        assert!(!high.crossed_by(f64::NAN));
        assert!(!low.crossed_by(f64::NAN));
    }

    #[test]
    fn test_sensor_object_path() {
        assert_eq!(
            sensor_object_path(SensorKind::Fan, "CPU Fan 1"),
            "/xyz/openbmc_project/sensors/fan_tach/CPU_Fan_1"
        );
        assert_eq!(
            sensor_object_path(SensorKind::Temperature, "Inlet"),
            "/xyz/openbmc_project/sensors/temperature/Inlet"
        );
    }

    #[test]
    fn test_sensor_kind_default_is_voltage() {
        assert_eq!(SensorKind::default(), SensorKind::Voltage);
        assert_eq!(
            SensorKind::default().configuration_interface(),
            "xyz.openbmc_project.Configuration.ADC"
        );
    }
}
