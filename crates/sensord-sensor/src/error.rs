//! Error types for building sensors.

use sensord_bus::BusError;
use thiserror::Error;

/// Errors that prevent a sensor from being created.
///
/// Once a sensor runs, nothing is fatal: read faults, bad thresholds and
/// missing property groups are logged and the loop carries on.
#[derive(Debug, Error)]
pub enum SensorError {
    /// The configuration entry cannot describe a working sensor.
    #[error("Invalid sensor configuration: {0}")]
    Config(#[from] sensord_core::Error),

    /// The value interface could not be registered.
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),
}

/// Result type alias for sensor construction.
pub type Result<T> = std::result::Result<T, SensorError>;
