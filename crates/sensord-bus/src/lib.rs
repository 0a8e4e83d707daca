//! Property bus and persistence collaborators for sensord.
//!
//! A sensor publishes its state as properties grouped into interfaces at an
//! object path, e.g.
//!
//! ```text
//! /xyz/openbmc_project/sensors/voltage/P12V
//! ├── xyz.openbmc_project.Sensor.Value             Value, MinValue, MaxValue
//! ├── xyz.openbmc_project.Sensor.Threshold.Warning WarningHigh (rw), WarningAlarmHigh, ...
//! └── xyz.openbmc_project.Sensor.Threshold.Critical CriticalHigh (rw), CriticalAlarmHigh, ...
//! ```
//!
//! The transport behind the bus is not part of this crate. [`PropertyBus`]
//! describes what a sensor needs from it, [`MemoryBus`] implements it in
//! process, and [`ThresholdPersister`] receives threshold writes for storage.
//!
//! # Write Routing
//!
//! Writable properties are registered with a [`WriteSink`]. An accepted
//! external write is queued to the owning sensor as a [`ThresholdWrite`]
//! and applied on the sensor's own task.

pub mod error;
pub mod memory;
pub mod mock;
pub mod persist;
pub mod traits;
pub mod types;

pub use error::{BusError, Result};
pub use memory::{MemoryBus, PropertyChange};
pub use persist::LoggingPersister;
pub use traits::{PropertyBus, ThresholdPersister};
pub use types::{InterfaceHandle, PersistRequest, PropertyValue, ThresholdWrite, WriteSink};
