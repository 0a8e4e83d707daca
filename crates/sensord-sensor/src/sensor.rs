//! One polled ADC sensor.
//!
//! An [`AdcSensor`] ties a [`SampleReader`] to a [`SensorPublisher`] and
//! runs both on a single task. Threshold writes arriving from the bus are
//! queued on an mpsc channel and applied by that same task, so a write can
//! never interleave with a value update or an evaluation.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use sensord_bus::{PropertyBus, ThresholdPersister, ThresholdWrite};
use sensord_core::constants::FAILED_SENSOR_VALUE;
use sensord_core::{SensorConfig, ThresholdKey};
use sensord_hardware::{
    DeviceChannel, ReaderState, SampleOutcome, SampleReader, SampleReport, Scheduler,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::Result;
use crate::publisher::SensorPublisher;

/// Whether a sensor can run another cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStatus {
    Continue,
    /// The device handle is gone; the sensor will not read again.
    Terminated,
}

/// Why [`AdcSensor::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    /// The cancellation token fired.
    Cancelled,
    /// The device handle was invalidated from elsewhere.
    Terminated,
}

/// A voltage-class sensor backed by one device file.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use sensord_bus::{LoggingPersister, MemoryBus};
/// use sensord_core::SensorConfig;
/// use sensord_hardware::{SysfsChannel, TokioScheduler};
/// use sensord_sensor::AdcSensor;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> sensord_sensor::Result<()> {
/// let config = SensorConfig::new("P12V", "/sys/class/hwmon/hwmon1/in1_input", "cfg/P12V");
/// let channel = SysfsChannel::open_path(&config.path).await;
/// let sensor = AdcSensor::new(
///     &config,
///     channel,
///     TokioScheduler,
///     Arc::new(MemoryBus::new()),
///     Arc::new(LoggingPersister),
/// )?;
///
/// sensor.run(CancellationToken::new()).await;
/// # Ok(())
/// # }
/// ```
pub struct AdcSensor<C, S> {
    reader: SampleReader<C, S>,
    publisher: SensorPublisher,
    writes: mpsc::UnboundedReceiver<ThresholdWrite>,
    write_tx: mpsc::UnboundedSender<ThresholdWrite>,
}

impl<C, S> AdcSensor<C, S>
where
    C: DeviceChannel,
    S: Scheduler,
{
    /// Validate `config`, register the sensor's properties and take
    /// ownership of `channel`.
    ///
    /// Unusable threshold entries are logged and skipped. An invalid scale
    /// factor, range or poll interval, or a failure to register the value
    /// interface, is an error.
    pub fn new(
        config: &SensorConfig,
        channel: C,
        scheduler: S,
        bus: Arc<dyn PropertyBus>,
        persister: Arc<dyn ThresholdPersister>,
    ) -> Result<Self> {
        config.validate()?;

        let (write_tx, writes) = mpsc::unbounded_channel();
        let thresholds = config.resolve_thresholds();
        let publisher =
            SensorPublisher::new(config, thresholds, bus, persister, write_tx.clone())?;
        let reader = SampleReader::new(
            config.name.clone(),
            channel,
            scheduler,
            config.poll_interval(),
            config.scale_factor,
        );

        info!(
            sensor = %config.name,
            path = %config.path.display(),
            object_path = %config.object_path(),
            "Sensor created"
        );

        Ok(Self {
            reader,
            publisher,
            writes,
            write_tx,
        })
    }

    pub fn name(&self) -> &str {
        self.publisher.name()
    }

    /// Latest published value. NaN until the first accepted reading.
    pub fn value(&self) -> f64 {
        self.publisher.value()
    }

    pub fn error_count(&self) -> usize {
        self.reader.error_count()
    }

    pub fn state(&self) -> ReaderState {
        self.reader.state()
    }

    pub fn poll_interval(&self) -> Duration {
        self.reader.poll_interval()
    }

    pub fn alarm(&self, key: ThresholdKey) -> Option<bool> {
        self.publisher.alarm(key)
    }

    pub fn threshold_value(&self, key: ThresholdKey) -> Option<f64> {
        self.publisher.threshold_value(key)
    }

    /// Sender for queueing threshold writes on this sensor's task.
    pub fn write_sender(&self) -> mpsc::UnboundedSender<ThresholdWrite> {
        self.write_tx.clone()
    }

    /// Apply every queued threshold write. Returns how many were applied.
    pub fn apply_pending_writes(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(write) = self.writes.try_recv() {
            if self.publisher.apply_write(write) {
                applied += 1;
            }
        }
        applied
    }

    fn publish(&mut self, report: SampleReport) {
        if let Some(reading) = report.reading
            && reading != self.publisher.value()
        {
            self.publisher.update(reading);
        }

        if report.sensor_failed {
            self.publisher.update(FAILED_SENSOR_VALUE);
        }
    }

    /// Run exactly one read, publish what it produced, then reopen the
    /// handle and wait out the poll interval.
    pub async fn cycle(&mut self) -> CycleStatus {
        self.apply_pending_writes();

        match self.reader.sample().await {
            SampleOutcome::Completed(report) => self.publish(report),
            SampleOutcome::Terminated => return CycleStatus::Terminated,
        }

        self.reader.reschedule().await;
        self.status()
    }

    fn status(&self) -> CycleStatus {
        if self.reader.state() == ReaderState::Terminated {
            CycleStatus::Terminated
        } else {
            CycleStatus::Continue
        }
    }

    /// Poll until `cancel` fires or the handle is invalidated, then tear
    /// the sensor down.
    ///
    /// Cancellation is observed while a read is in flight and while
    /// waiting for the next poll. Threshold writes are applied as they
    /// arrive during the wait, and any still queued at exit are applied
    /// before the properties are withdrawn.
    pub async fn run(mut self, cancel: CancellationToken) -> RunExit {
        debug!(sensor = %self.name(), "Sensor task started");

        let exit = 'poll: loop {
            self.apply_pending_writes();

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => break 'poll RunExit::Cancelled,
                outcome = self.reader.sample() => outcome,
            };
            match outcome {
                SampleOutcome::Completed(report) => self.publish(report),
                SampleOutcome::Terminated => break 'poll RunExit::Terminated,
            }

            {
                let wait = self.reader.reschedule();
                tokio::pin!(wait);
                loop {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break 'poll RunExit::Cancelled,
                        _ = &mut wait => break,
                        Some(write) = self.writes.recv() => {
                            self.publisher.apply_write(write);
                        }
                    }
                }
            }

            if self.status() == CycleStatus::Terminated {
                break RunExit::Terminated;
            }
        };

        // Writes the bus already accepted must still reach the persister.
        self.apply_pending_writes();

        info!(sensor = %self.name(), exit = ?exit, "Sensor stopped");
        self.shutdown();
        exit
    }

    /// Close the device handle for good and withdraw every property.
    pub fn shutdown(&mut self) {
        self.reader.shutdown();
        self.publisher.withdraw();
    }
}

impl<C, S> fmt::Debug for AdcSensor<C, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdcSensor")
            .field("reader", &self.reader)
            .field("publisher", &self.publisher)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use sensord_bus::mock::MockPersister;
    use sensord_bus::{MemoryBus, PropertyValue};
    use sensord_core::constants::VALUE_INTERFACE;
    use sensord_core::{RawThreshold, ThresholdDirection, ThresholdLevel};
    use sensord_hardware::mock::{ChannelEvent, InstantScheduler, MockChannel, MockChannelHandle};
    use std::io;

    const PATH: &str = "/xyz/openbmc_project/sensors/voltage/P12V";
    const CRITICAL_HIGH: ThresholdKey =
        ThresholdKey::new(ThresholdLevel::Critical, ThresholdDirection::High);

    struct Fixture {
        sensor: AdcSensor<MockChannel, InstantScheduler>,
        channel: MockChannelHandle,
        scheduler: InstantScheduler,
        bus: Arc<MemoryBus>,
        persister: MockPersister,
    }

    fn fixture(config: SensorConfig) -> Fixture {
        let (channel, handle) = MockChannel::new(&config.path);
        let scheduler = InstantScheduler::new();
        let bus = Arc::new(MemoryBus::new());
        let persister = MockPersister::new();
        let sensor = AdcSensor::new(
            &config,
            channel,
            scheduler.clone(),
            bus.clone(),
            Arc::new(persister.clone()),
        )
        .unwrap();
        Fixture {
            sensor,
            channel: handle,
            scheduler,
            bus,
            persister,
        }
    }

    fn config() -> SensorConfig {
        SensorConfig::new("P12V", "/sys/class/hwmon/hwmon1/in1_input", "cfg/P12V")
    }

    #[rstest]
    #[case(config().with_scale_factor(0.0))]
    #[case(config().with_range(5.0, 1.0))]
    #[case(config().with_poll_interval(Duration::ZERO))]
    fn test_new_rejects_invalid_config(#[case] config: SensorConfig) {
        let (channel, _handle) = MockChannel::new(&config.path);
        let result = AdcSensor::new(
            &config,
            channel,
            InstantScheduler::new(),
            Arc::new(MemoryBus::new()),
            Arc::new(MockPersister::new()),
        );
        assert!(matches!(result, Err(crate::SensorError::Config(_))));
    }

    #[tokio::test]
    async fn test_cycle_publishes_scaled_value() {
        let mut f = fixture(config());
        f.channel.push_line("45000");

        assert_eq!(f.sensor.cycle().await, CycleStatus::Continue);

        assert_eq!(f.sensor.value(), 45.0);
        assert_eq!(f.sensor.error_count(), 0);
        assert_eq!(
            f.bus.get(PATH, VALUE_INTERFACE, "Value"),
            Some(PropertyValue::Double(45.0))
        );
        assert_eq!(f.scheduler.sleeps(), vec![Duration::from_millis(500)]);
    }

    #[tokio::test]
    async fn test_unparsable_record_keeps_value() {
        let mut f = fixture(config());
        f.channel.push_line("45000");
        f.channel.push_line("abc");

        f.sensor.cycle().await;
        f.sensor.cycle().await;

        assert_eq!(f.sensor.value(), 45.0);
        assert_eq!(f.sensor.error_count(), 1);
        assert_eq!(f.bus.changes_for("Value").len(), 1);
    }

    #[tokio::test]
    async fn test_unchanged_reading_is_not_republished() {
        let mut f = fixture(config());
        f.channel.repeat_line("12000");

        f.sensor.cycle().await;
        f.sensor.cycle().await;
        f.sensor.cycle().await;

        assert_eq!(f.bus.changes_for("Value"), vec![PropertyValue::Double(12.0)]);
    }

    #[tokio::test]
    async fn test_failed_sensor_publishes_zero_once() {
        let mut f = fixture(config());
        f.channel.push_line("45000");
        f.channel.repeat_error(io::ErrorKind::TimedOut);

        for _ in 0..15 {
            f.sensor.cycle().await;
        }

        assert_eq!(f.sensor.error_count(), 14);
        assert_eq!(
            f.bus.changes_for("Value"),
            vec![PropertyValue::Double(45.0), PropertyValue::Double(0.0)]
        );
    }

    #[tokio::test]
    async fn test_pending_write_applies_before_next_read() {
        let mut f = fixture(config().with_threshold(RawThreshold::new("critical", "high", 90.0)));
        f.channel.repeat_line("80000");

        f.sensor
            .write_sender()
            .send(ThresholdWrite {
                key: CRITICAL_HIGH,
                value: 75.0,
            })
            .unwrap();
        f.sensor.cycle().await;

        assert_eq!(f.sensor.threshold_value(CRITICAL_HIGH), Some(75.0));
        assert_eq!(f.sensor.alarm(CRITICAL_HIGH), Some(true));
        assert_eq!(f.persister.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_cycle_reads_from_fresh_handle() {
        let mut f = fixture(config());
        f.channel.repeat_line("1000");

        f.sensor.cycle().await;
        f.sensor.cycle().await;

        assert_eq!(
            f.channel.events(),
            vec![
                ChannelEvent::Opened { generation: 1 },
                ChannelEvent::Read { generation: 1 },
                ChannelEvent::Closed,
                ChannelEvent::Opened { generation: 2 },
                ChannelEvent::Read { generation: 2 },
                ChannelEvent::Closed,
                ChannelEvent::Opened { generation: 3 },
            ]
        );
    }

    #[tokio::test]
    async fn test_invalidated_handle_terminates_without_touching_state() {
        let mut f = fixture(config());
        f.channel.push_line("45000");
        f.sensor.cycle().await;
        let changes = f.bus.changes().len();

        f.channel.invalidate();

        assert_eq!(f.sensor.cycle().await, CycleStatus::Terminated);
        assert_eq!(f.sensor.state(), ReaderState::Terminated);
        assert_eq!(f.sensor.error_count(), 0);
        assert_eq!(f.sensor.value(), 45.0);
        assert_eq!(f.bus.changes().len(), changes);
    }

    #[tokio::test]
    async fn test_shutdown_before_first_read() {
        let mut f = fixture(config().with_threshold(RawThreshold::new("warning", "high", 1.0)));

        f.sensor.shutdown();

        assert!(f.channel.is_invalidated());
        assert_eq!(f.bus.interface_count(), 0);
        assert!(f.sensor.value().is_nan());
        assert_eq!(f.sensor.cycle().await, CycleStatus::Terminated);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let f = fixture(config());
        f.channel.repeat_line("3300");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let exit = f.sensor.run(cancel).await;

        assert_eq!(exit, RunExit::Cancelled);
        assert!(f.channel.is_invalidated());
        assert_eq!(f.bus.interface_count(), 0);
    }

    #[tokio::test]
    async fn test_run_stops_when_handle_invalidated() {
        let f = fixture(config());
        f.channel.push_line("3300");
        f.channel.push_line("3400");
        f.channel.invalidate();

        let exit = f.sensor.run(CancellationToken::new()).await;

        assert_eq!(exit, RunExit::Terminated);
        assert_eq!(f.bus.interface_count(), 0);
    }
}
