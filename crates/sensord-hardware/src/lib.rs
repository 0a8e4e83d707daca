//! Device access layer for sensord.
//!
//! This crate owns everything between a kernel-exposed value file and a
//! scaled reading:
//!
//! - [`DeviceChannel`]: a non-blocking handle to one device file, with the
//!   sysfs implementation [`SysfsChannel`] and the enum wrapper
//!   [`AnyDeviceChannel`](devices::AnyDeviceChannel).
//! - [`Scheduler`]: the poll timer, injected so tests control time.
//! - [`SampleReader`]: the read, parse, reopen and wait cycle with the
//!   consecutive-failure counter.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use sensord_hardware::{SampleOutcome, SampleReader, SysfsChannel, TokioScheduler};
//!
//! #[tokio::main]
//! async fn main() {
//!     let channel = SysfsChannel::open_path("/sys/class/hwmon/hwmon1/in1_input").await;
//!     let mut reader = SampleReader::new(
//!         "P12V",
//!         channel,
//!         TokioScheduler,
//!         Duration::from_millis(500),
//!         1.0,
//!     );
//!
//!     loop {
//!         match reader.sample().await {
//!             SampleOutcome::Completed(report) => println!("{:?}", report.reading),
//!             SampleOutcome::Terminated => break,
//!         }
//!         reader.reschedule().await;
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! Channel operations return [`Result<T>`][error::Result] with
//! [`HardwareError`]. The reader never propagates them: faults are counted
//! and logged, and only [`HardwareError::Invalidated`] ends the loop.

pub mod devices;
pub mod error;
pub mod mock;
pub mod reader;
pub mod scheduler;
pub mod sysfs;
pub mod traits;

// Re-export commonly used types for convenience
pub use devices::AnyDeviceChannel;
pub use error::{HardwareError, Result};
pub use reader::{ReaderState, SampleOutcome, SampleReader, SampleReport, parse_reading};
pub use scheduler::TokioScheduler;
pub use sysfs::SysfsChannel;
pub use traits::{DeviceChannel, Scheduler};
