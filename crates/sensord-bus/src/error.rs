//! Error types for property bus operations.

/// Result type alias for bus operations.
pub type Result<T> = std::result::Result<T, BusError>;

/// Errors reported by a property bus.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// No interface is registered under the handle or path.
    #[error("Interface not found: {interface} at {path}")]
    InterfaceNotFound { path: String, interface: String },

    /// The interface exists but does not carry the property.
    #[error("Property not found: {property}")]
    PropertyNotFound { property: String },

    /// An external client tried to write a read-only property.
    #[error("Property is read-only: {property}")]
    PropertyReadOnly { property: String },

    /// The new value has a different type than the registered one.
    #[error("Type mismatch for property {property}")]
    TypeMismatch { property: String },

    /// The interface could not be created or published.
    #[error("Initialization failed: {message}")]
    InitializationFailed { message: String },

    /// The owner of a writable property is gone.
    #[error("Write rejected: {message}")]
    WriteRejected { message: String },
}

impl BusError {
    /// Create a new interface-not-found error.
    pub fn interface_not_found(path: impl Into<String>, interface: impl Into<String>) -> Self {
        Self::InterfaceNotFound {
            path: path.into(),
            interface: interface.into(),
        }
    }

    /// Create a new property-not-found error.
    pub fn property_not_found(property: impl Into<String>) -> Self {
        Self::PropertyNotFound {
            property: property.into(),
        }
    }

    /// Create a new initialization failed error.
    pub fn initialization_failed(message: impl Into<String>) -> Self {
        Self::InitializationFailed {
            message: message.into(),
        }
    }

    /// Create a new write rejected error.
    pub fn write_rejected(message: impl Into<String>) -> Self {
        Self::WriteRejected {
            message: message.into(),
        }
    }
}
