//! Error types for device channel operations.
//!
//! This module defines the failures a sampling cycle can observe. Only
//! [`HardwareError::Invalidated`] ends a sensor's loop; everything else is a
//! transient fault that is counted and retried on the next cycle.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur while reading a device channel.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// The handle was torn down while the sensor is being destroyed.
    #[error("Device handle invalidated: {device}")]
    Invalidated { device: String },

    /// The device file is not open, usually after a failed reopen.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// The record could not be turned into a reading.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with custom message.
    #[error("{0}")]
    Other(String),
}

impl HardwareError {
    /// Create a new invalidated error.
    pub fn invalidated(device: impl Into<String>) -> Self {
        Self::Invalidated {
            device: device.into(),
        }
    }

    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Create a generic error with custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Whether this error marks the end of the handle's life.
    pub fn is_invalidated(&self) -> bool {
        matches!(self, Self::Invalidated { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalidated_error() {
        let error = HardwareError::invalidated("/sys/class/hwmon/hwmon0/in1_input");
        assert!(error.is_invalidated());
        assert_eq!(
            error.to_string(),
            "Device handle invalidated: /sys/class/hwmon/hwmon0/in1_input"
        );
    }

    #[test]
    fn test_disconnected_error() {
        let error = HardwareError::disconnected("in1_input");
        assert!(!error.is_invalidated());
        assert_eq!(error.to_string(), "Device disconnected: in1_input");
    }

    #[test]
    fn test_invalid_data_error() {
        let error = HardwareError::invalid_data("not a number: abc");
        assert!(matches!(error, HardwareError::InvalidData { .. }));
        assert_eq!(error.to_string(), "Invalid data: not a number: abc");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::from(std::io::ErrorKind::NotFound);
        let error: HardwareError = io.into();
        assert!(matches!(error, HardwareError::Io(_)));
        assert!(!error.is_invalidated());
    }
}
