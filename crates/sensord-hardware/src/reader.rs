//! Sampling loop for one device file.
//!
//! A [`SampleReader`] turns a [`DeviceChannel`] into a stream of scaled
//! readings, one per poll interval, and keeps the consecutive-failure count
//! that decides when the sensor is reported as failed.
//!
//! # States
//!
//! ```text
//!          ┌───────────────────────────────────────────────┐
//!          ▼                                               │
//!        Idle ──timer──► Reading ──ok──► Parsing ──┐       │
//!                           │                      ├──► Rescheduled
//!                           └──err──► Faulted ─────┘
//!                           │
//!                           └──handle invalidated──► Terminated
//! ```
//!
//! A cycle is split in two calls so the owner can publish the reading in
//! between: [`SampleReader::sample`] covers `Reading` through
//! `Parsing`/`Faulted`, and [`SampleReader::reschedule`] closes and reopens
//! the handle and waits out the poll interval. The next read can only be
//! issued after `reschedule` has completed, so two reads of the same
//! sensor are never in flight together.

use std::fmt;
use std::time::Duration;

use sensord_core::constants::{HARDWARE_SCALE_FACTOR, WARN_AFTER_ERROR_COUNT};
use tracing::{debug, error, warn};

use crate::error::{HardwareError, Result};
use crate::traits::{DeviceChannel, Scheduler};

/// Position of a reader in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReaderState {
    /// No I/O outstanding; waiting for the poll timer.
    Idle,
    /// A record read is in flight.
    Reading,
    /// The last read returned a record.
    Parsing,
    /// The last read failed.
    Faulted,
    /// Reopening the handle and waiting for the next poll.
    Rescheduled,
    /// The handle was invalidated; the reader will not run again.
    Terminated,
}

impl fmt::Display for ReaderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::Reading => "Reading",
            Self::Parsing => "Parsing",
            Self::Faulted => "Faulted",
            Self::Rescheduled => "Rescheduled",
            Self::Terminated => "Terminated",
        };
        f.write_str(name)
    }
}

/// Result of one read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleReport {
    /// Scaled reading, if the record parsed.
    pub reading: Option<f64>,
    /// Consecutive failures after this read.
    pub error_count: usize,
    /// Set on the single read where the failure count reaches the limit.
    pub sensor_failed: bool,
}

/// What [`SampleReader::sample`] observed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleOutcome {
    Completed(SampleReport),
    /// The handle was torn down; stop without touching sensor state.
    Terminated,
}

/// Parse one device record and scale it to engineering units.
///
/// Only the first line is considered. Leading whitespace is skipped and the
/// longest numeric prefix is taken, so trailing text after the number is
/// ignored. A line that does not start with a number is an error.
///
/// ```
/// use sensord_hardware::reader::parse_reading;
///
/// assert_eq!(parse_reading("45000\n", 1.0).unwrap(), 45.0);
/// assert_eq!(parse_reading("12000\n", 2.0).unwrap(), 6.0);
/// assert_eq!(parse_reading("45000 mV\n", 1.0).unwrap(), 45.0);
/// assert!(parse_reading("abc\n", 1.0).is_err());
/// ```
pub fn parse_reading(record: &str, scale_factor: f64) -> Result<f64> {
    let line = record.lines().next().unwrap_or("").trim_start();
    let raw: f64 = numeric_prefix(line)
        .and_then(|prefix| prefix.parse().ok())
        .ok_or_else(|| {
            HardwareError::invalid_data(format!("not a number: {:?}", line.trim_end()))
        })?;
    Ok(raw / HARDWARE_SCALE_FACTOR / scale_factor)
}

/// Longest prefix of `s` that reads as a decimal floating point number.
fn numeric_prefix(s: &str) -> Option<&str> {
    let bytes = s.as_bytes();
    let digits_from = |start: usize| {
        bytes[start..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }

    for word in ["infinity", "inf", "nan"] {
        let candidate = s.get(end..end + word.len());
        if candidate.is_some_and(|c| c.eq_ignore_ascii_case(word)) {
            return Some(&s[..end + word.len()]);
        }
    }

    let integer = digits_from(end);
    end += integer;
    let mut fraction = 0;
    if bytes.get(end) == Some(&b'.') {
        fraction = digits_from(end + 1);
        if integer + fraction > 0 {
            end += 1 + fraction;
        }
    }
    if integer + fraction == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_digits = digits_from(exp);
        if exp_digits > 0 {
            end = exp + exp_digits;
        }
    }

    Some(&s[..end])
}

/// Polls one device file and scales what it reads.
pub struct SampleReader<C, S> {
    name: String,
    channel: C,
    scheduler: S,
    poll_interval: Duration,
    scale_factor: f64,
    error_count: usize,
    state: ReaderState,
}

impl<C, S> SampleReader<C, S>
where
    C: DeviceChannel,
    S: Scheduler,
{
    pub fn new(
        name: impl Into<String>,
        channel: C,
        scheduler: S,
        poll_interval: Duration,
        scale_factor: f64,
    ) -> Self {
        Self {
            name: name.into(),
            channel,
            scheduler,
            poll_interval,
            scale_factor,
            error_count: 0,
            state: ReaderState::Idle,
        }
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Read and parse one record.
    ///
    /// A parsed record resets the failure count; an unparsable record or a
    /// read error increments it. When the count reaches
    /// [`WARN_AFTER_ERROR_COUNT`] on this read the report carries
    /// `sensor_failed`. The count keeps growing afterwards, so the flag is
    /// raised once per failure episode.
    pub async fn sample(&mut self) -> SampleOutcome {
        if self.state == ReaderState::Terminated {
            return SampleOutcome::Terminated;
        }

        self.state = ReaderState::Reading;
        let record = self.channel.read_record().await;

        let reading = match record {
            Err(e) if e.is_invalidated() => {
                self.state = ReaderState::Terminated;
                return SampleOutcome::Terminated;
            }
            Ok(record) => {
                self.state = ReaderState::Parsing;
                match parse_reading(&record, self.scale_factor) {
                    Ok(value) => {
                        self.error_count = 0;
                        Some(value)
                    }
                    Err(e) => {
                        self.error_count += 1;
                        debug!(
                            sensor = %self.name,
                            error = %e,
                            error_count = self.error_count,
                            "Discarding unparsable record"
                        );
                        None
                    }
                }
            }
            Err(e) => {
                self.state = ReaderState::Faulted;
                self.error_count += 1;
                warn!(
                    sensor = %self.name,
                    path = %self.channel.path().display(),
                    error = %e,
                    error_count = self.error_count,
                    "Failure to read sensor"
                );
                None
            }
        };

        let sensor_failed = self.error_count == WARN_AFTER_ERROR_COUNT;
        if sensor_failed {
            error!(
                sensor = %self.name,
                path = %self.channel.path().display(),
                error_count = self.error_count,
                "Sensor presumed failed"
            );
        }

        SampleOutcome::Completed(SampleReport {
            reading,
            error_count: self.error_count,
            sensor_failed,
        })
    }

    /// Reopen the device file and wait for the next poll.
    ///
    /// The handle is always closed and reopened, whatever the previous read
    /// returned. A failed reopen leaves the channel closed; the next read
    /// then fails and is counted like any other fault.
    pub async fn reschedule(&mut self) {
        if self.state == ReaderState::Terminated {
            return;
        }

        self.state = ReaderState::Rescheduled;
        self.channel.close();
        if let Err(e) = self.channel.open().await {
            if e.is_invalidated() {
                self.state = ReaderState::Terminated;
                return;
            }
            debug!(
                sensor = %self.name,
                path = %self.channel.path().display(),
                error = %e,
                "Reopen failed"
            );
        }

        self.scheduler.sleep(self.poll_interval).await;
        self.state = ReaderState::Idle;
    }

    /// Release the handle for good. Later samples report `Terminated`.
    pub fn shutdown(&mut self) {
        self.channel.invalidate();
        self.state = ReaderState::Terminated;
    }
}

impl<C, S> fmt::Debug for SampleReader<C, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleReader")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("error_count", &self.error_count)
            .field("scale_factor", &self.scale_factor)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}
