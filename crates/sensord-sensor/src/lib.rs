//! Polled ADC sensors for sensord.
//!
//! This crate joins the device layer and the property bus:
//!
//! - [`SensorPublisher`]: value, range, thresholds and alarms of one sensor
//!   as bus properties.
//! - [`AdcSensor`]: the per-sensor task that reads, publishes and applies
//!   threshold writes.
//! - [`SensorManager`]: spawns and stops every configured sensor.
//!
//! # Threshold Semantics
//!
//! A `High` threshold is asserted while the value is strictly greater than
//! its crossing point, a `Low` threshold while the value is strictly less.
//! Alarm properties are republished only when their state changes.

pub mod error;
pub mod manager;
pub mod publisher;
pub mod sensor;

pub use error::{Result, SensorError};
pub use manager::{SensorManager, SensorManagerHandle, ShutdownReport};
pub use publisher::SensorPublisher;
pub use sensor::{AdcSensor, CycleStatus, RunExit};
