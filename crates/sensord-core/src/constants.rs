//! Core constants for the sensor daemon.
//!
//! This module centralizes the fixed values that define how a sensor is
//! sampled and how it is exposed on the property bus. Sensor pipelines,
//! publishers and tests all read from here so the numbers stay consistent.
//!
//! # Sampling Pipeline
//!
//! ```text
//! device file ──"45000\n"──► raw / HARDWARE_SCALE_FACTOR / scale_factor ──► 45.0
//! ```
//!
//! # Usage
//!
//! ```
//! use sensord_core::constants::*;
//! use std::time::Duration;
//!
//! let interval = Duration::from_millis(DEFAULT_POLL_INTERVAL_MS);
//! assert_eq!(interval.as_millis(), 500);
//!
//! let volts = 45000.0 / HARDWARE_SCALE_FACTOR / 1.0;
//! assert_eq!(volts, 45.0);
//! ```

// ============================================================================
// Sampling
// ============================================================================

/// Default delay between two reads of the same device file (milliseconds).
///
/// # Value: 500ms
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Fixed divisor between raw hwmon units and engineering units.
///
/// The kernel exposes values in thousandths (millivolts, millidegrees).
/// The per-sensor scale factor is applied after this division.
///
/// # Value: 1000
pub const HARDWARE_SCALE_FACTOR: f64 = 1000.0;

/// Number of consecutive failed reads after which a sensor is reported as
/// failed.
///
/// The report is a single value update to [`FAILED_SENSOR_VALUE`] emitted on
/// the cycle where the counter reaches exactly this value.
///
/// # Value: 10
pub const WARN_AFTER_ERROR_COUNT: usize = 10;

/// Value published once when a sensor is presumed failed.
pub const FAILED_SENSOR_VALUE: f64 = 0.0;

// ============================================================================
// Display Defaults
// ============================================================================

/// Default `MinValue` when the configuration does not provide one.
pub const DEFAULT_MIN_VALUE: f64 = 0.0;

/// Default `MaxValue` when the configuration does not provide one.
pub const DEFAULT_MAX_VALUE: f64 = 20.0;

/// Default application scale factor.
pub const DEFAULT_SCALE_FACTOR: f64 = 1.0;

// ============================================================================
// Property Bus Naming
// ============================================================================

/// Root of every sensor object path.
///
/// ```
/// use sensord_core::constants::SENSOR_PATH_ROOT;
///
/// let path = format!("{}/voltage/P12V", SENSOR_PATH_ROOT);
/// assert_eq!(path, "/xyz/openbmc_project/sensors/voltage/P12V");
/// ```
pub const SENSOR_PATH_ROOT: &str = "/xyz/openbmc_project/sensors";

/// Interface carrying `Value`, `MinValue` and `MaxValue`.
pub const VALUE_INTERFACE: &str = "xyz.openbmc_project.Sensor.Value";

/// Interface carrying the warning threshold and alarm properties.
pub const WARNING_INTERFACE: &str = "xyz.openbmc_project.Sensor.Threshold.Warning";

/// Interface carrying the critical threshold and alarm properties.
pub const CRITICAL_INTERFACE: &str = "xyz.openbmc_project.Sensor.Threshold.Critical";

/// Read-only property holding the current reading.
pub const PROPERTY_VALUE: &str = "Value";

/// Read-only property holding the upper display bound.
pub const PROPERTY_MAX_VALUE: &str = "MaxValue";

/// Read-only property holding the lower display bound.
pub const PROPERTY_MIN_VALUE: &str = "MinValue";
