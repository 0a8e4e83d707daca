//! Value and routing types shared by bus implementations.

use std::fmt;

use sensord_core::{Threshold, ThresholdKey};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Value of a bus property.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Double(f64),
    Bool(bool),
}

impl PropertyValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            Self::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Double(_) => None,
        }
    }

    /// Whether both values carry the same variant.
    pub fn same_type(&self, other: &PropertyValue) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Double(v) => write!(f, "{}", v),
            Self::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Handle to an interface registered on the bus.
///
/// Handles are cheap to clone; the bus decides what `id` means.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterfaceHandle {
    pub id: u64,
    pub path: String,
    pub interface: String,
}

/// Threshold write delivered from the bus to the owning sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdWrite {
    pub key: ThresholdKey,
    pub value: f64,
}

/// Route from a writable threshold property back to its sensor.
///
/// The bus calls [`WriteSink::submit`] when an external client writes the
/// property. Writes are queued on the sensor's own task, so they are never
/// applied halfway through a threshold evaluation.
#[derive(Debug, Clone)]
pub struct WriteSink {
    key: ThresholdKey,
    tx: mpsc::UnboundedSender<ThresholdWrite>,
}

impl WriteSink {
    pub fn new(key: ThresholdKey, tx: mpsc::UnboundedSender<ThresholdWrite>) -> Self {
        Self { key, tx }
    }

    pub fn key(&self) -> ThresholdKey {
        self.key
    }

    /// Queue a write for the sensor. Returns `false` if the sensor is gone.
    pub fn submit(&self, value: f64) -> bool {
        self.tx
            .send(ThresholdWrite {
                key: self.key,
                value,
            })
            .is_ok()
    }
}

/// Request to store an updated threshold in the configuration backend.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistRequest {
    /// Configuration identity of the sensor.
    pub configuration: String,
    /// Configuration interface kind, e.g. `xyz.openbmc_project.Configuration.ADC`.
    pub interface: String,
    pub threshold: Threshold,
}
