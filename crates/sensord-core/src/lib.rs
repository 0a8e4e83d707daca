//! Core domain types shared by every sensord crate.
//!
//! This crate holds the threshold model, sensor kinds, the configuration
//! input handed over by sensor discovery, and the common error type.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

pub use config::{DaemonConfig, RawThreshold, SensorConfig};
pub use error::{Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
