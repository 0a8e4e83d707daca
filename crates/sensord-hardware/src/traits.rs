//! Device channel and scheduling trait definitions.
//!
//! These traits separate the sampling loop from the two things it waits on:
//! the device file and the poll timer. Real implementations talk to sysfs and
//! the Tokio timer; the mocks in [`crate::mock`] make both deterministic.
//!
//! Methods that suspend return `impl Future + Send` so a sensor generic over
//! these traits can still be spawned onto a multi-threaded runtime.
//! Implementations may use plain `async fn`.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use crate::error::Result;

/// Non-blocking handle to a kernel-exposed device file.
///
/// A channel is always in one of three states:
///
/// - open and readable,
/// - closed and waiting for the next [`open`](Self::open),
/// - invalidated by [`invalidate`](Self::invalidate), after which every
///   read fails with [`HardwareError::Invalidated`](crate::HardwareError::Invalidated).
///
/// # Examples
///
/// ```no_run
/// use sensord_hardware::{DeviceChannel, Result};
///
/// async fn sample<C: DeviceChannel>(channel: &mut C) -> Result<String> {
///     let record = channel.read_record().await?;
///     channel.close();
///     channel.open().await?;
///     Ok(record)
/// }
/// ```
pub trait DeviceChannel: Send {
    /// Path of the device file.
    fn path(&self) -> &Path;

    /// Open the device file, replacing any previous handle.
    ///
    /// On failure the channel stays closed; the next read reports the fault.
    fn open(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Read one newline-delimited record.
    fn read_record(&mut self) -> impl Future<Output = Result<String>> + Send;

    /// Release the handle. Closing a closed channel does nothing.
    fn close(&mut self);

    /// Release the handle for good. Used during teardown.
    fn invalidate(&mut self);

    /// Whether a handle is currently held.
    fn is_open(&self) -> bool;
}

/// Source of poll-interval delays.
///
/// Injected into every sensor at construction instead of being reached
/// through a global, so tests can substitute a scheduler that does not
/// wait on wall-clock time.
pub trait Scheduler: Send + Sync {
    /// Complete after `duration` has elapsed.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}
