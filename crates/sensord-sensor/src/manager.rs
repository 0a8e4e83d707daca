//! Sensor task manager.
//!
//! The `SensorManager` owns the shared bus and persister, spawns one task
//! per configured sensor, and tears them all down together.
//!
//! # Architecture
//!
//! ```text
//!                  ┌────────────┐
//!  config ───────► │  Manager   │──── CancellationToken ────┐
//!                  └─────┬──────┘                           │
//!                        │ spawn                            ▼
//!        ┌───────────────┼───────────────┐          ┌──────────────┐
//!        ▼               ▼               ▼          │   JoinSet    │
//!   ┌─────────┐     ┌─────────┐     ┌─────────┐     │ (per sensor) │
//!   │ P12V    │     │ P5V     │     │ P3V3    │     └──────────────┘
//!   │ task    │     │ task    │     │ task    │
//!   └────┬────┘     └────┬────┘     └────┬────┘
//!        └───────────────┴───────────────┴──────► PropertyBus
//! ```
//!
//! A sensor whose construction fails is reported when its task finishes;
//! the other sensors keep running.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use sensord_bus::{LoggingPersister, MemoryBus};
//! use sensord_core::DaemonConfig;
//! use sensord_hardware::TokioScheduler;
//! use sensord_sensor::SensorManager;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DaemonConfig::from_file("/etc/sensord/sensors.json")?;
//!     let manager = SensorManager::load(
//!         &config,
//!         TokioScheduler,
//!         Arc::new(MemoryBus::new()),
//!         Arc::new(LoggingPersister),
//!     );
//!
//!     let handle = manager.start();
//!     tokio::signal::ctrl_c().await?;
//!     handle.shutdown().await;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use sensord_bus::{PropertyBus, ThresholdPersister};
use sensord_core::{DaemonConfig, SensorConfig};
use sensord_hardware::{AnyDeviceChannel, Scheduler, SysfsChannel, TokioScheduler};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::sensor::{AdcSensor, RunExit};

/// A sensor waiting to be started.
#[derive(Debug)]
struct PendingSensor {
    config: SensorConfig,
    /// Channel supplied by the caller. `None` opens `config.path`.
    channel: Option<AnyDeviceChannel>,
}

/// Counts of how sensor tasks ended, as seen by [`SensorManagerHandle::shutdown`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Tasks that stopped on their own or on cancellation.
    pub completed: usize,
    /// Sensors that could not be created.
    pub failed: usize,
    /// Tasks aborted before finishing.
    pub cancelled: usize,
    /// Tasks that panicked.
    pub panicked: usize,
}

impl ShutdownReport {
    pub fn total(&self) -> usize {
        self.completed + self.failed + self.cancelled + self.panicked
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskTermination {
    Success,
    Error,
    Cancelled,
    Panic,
}

/// Running sensor tasks.
pub struct SensorManagerHandle {
    cancel: CancellationToken,
    tasks: JoinSet<Result<RunExit>>,
}

impl SensorManagerHandle {
    /// Number of sensor tasks that have not been joined yet.
    pub fn sensor_count(&self) -> usize {
        self.tasks.len()
    }

    /// Stop every sensor and wait for all tasks to finish.
    ///
    /// Each sensor withdraws its properties before its task returns.
    /// Individual task failures are logged and counted, never returned.
    pub async fn shutdown(mut self) -> ShutdownReport {
        self.cancel.cancel();

        let mut report = ShutdownReport::default();
        while let Some(result) = self.tasks.join_next().await {
            match Self::classify_task_result(result) {
                TaskTermination::Success => report.completed += 1,
                TaskTermination::Error => report.failed += 1,
                TaskTermination::Cancelled => report.cancelled += 1,
                TaskTermination::Panic => report.panicked += 1,
            }
        }

        if report.failed + report.panicked > 0 {
            warn!(
                completed = report.completed,
                failed = report.failed,
                panicked = report.panicked,
                "Sensor tasks ended with errors"
            );
        } else {
            info!(completed = report.completed, "All sensor tasks stopped");
        }
        report
    }

    fn classify_task_result(
        result: std::result::Result<Result<RunExit>, tokio::task::JoinError>,
    ) -> TaskTermination {
        match result {
            Ok(Ok(_)) => TaskTermination::Success,
            Ok(Err(_)) => TaskTermination::Error,
            Err(e) if e.is_cancelled() => TaskTermination::Cancelled,
            Err(e) => {
                error!(error = %e, "Sensor task panicked");
                TaskTermination::Panic
            }
        }
    }
}

/// Creates and supervises sensor tasks.
///
/// # Lifecycle
///
/// 1. Create the manager with the shared bus, persister and scheduler
/// 2. Register sensors, or build them all from a [`DaemonConfig`]
/// 3. Call `start()` to spawn one task per sensor
/// 4. Call `shutdown()` on the returned handle to stop them
pub struct SensorManager<S = TokioScheduler> {
    scheduler: S,
    bus: Arc<dyn PropertyBus>,
    persister: Arc<dyn ThresholdPersister>,
    sensors: Vec<PendingSensor>,
}

impl<S> SensorManager<S>
where
    S: Scheduler + Clone + 'static,
{
    pub fn new(
        scheduler: S,
        bus: Arc<dyn PropertyBus>,
        persister: Arc<dyn ThresholdPersister>,
    ) -> Self {
        Self {
            scheduler,
            bus,
            persister,
            sensors: Vec::new(),
        }
    }

    /// Create a manager with every sensor in `config` registered.
    pub fn load(
        config: &DaemonConfig,
        scheduler: S,
        bus: Arc<dyn PropertyBus>,
        persister: Arc<dyn ThresholdPersister>,
    ) -> Self {
        let mut manager = Self::new(scheduler, bus, persister);
        for sensor in &config.sensors {
            manager.register(sensor.clone());
        }
        manager
    }

    /// Register a sensor read from its sysfs path.
    pub fn register(&mut self, config: SensorConfig) {
        self.sensors.push(PendingSensor {
            config,
            channel: None,
        });
    }

    /// Register a sensor read through `channel` instead of its path.
    pub fn register_with_channel(&mut self, config: SensorConfig, channel: AnyDeviceChannel) {
        self.sensors.push(PendingSensor {
            config,
            channel: Some(channel),
        });
    }

    /// Number of registered sensors.
    pub fn sensor_count(&self) -> usize {
        self.sensors.len()
    }

    /// Spawn one task per registered sensor.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(self) -> SensorManagerHandle {
        let cancel = CancellationToken::new();
        let mut tasks = JoinSet::new();

        info!(sensors = self.sensors.len(), "Starting sensors");

        for pending in self.sensors {
            let scheduler = self.scheduler.clone();
            let bus = Arc::clone(&self.bus);
            let persister = Arc::clone(&self.persister);
            let cancel = cancel.child_token();

            tasks.spawn(run_sensor(pending, scheduler, bus, persister, cancel));
        }

        SensorManagerHandle { cancel, tasks }
    }
}

async fn run_sensor<S>(
    pending: PendingSensor,
    scheduler: S,
    bus: Arc<dyn PropertyBus>,
    persister: Arc<dyn ThresholdPersister>,
    cancel: CancellationToken,
) -> Result<RunExit>
where
    S: Scheduler,
{
    let PendingSensor { config, channel } = pending;
    let channel = match channel {
        Some(channel) => channel,
        None => SysfsChannel::open_path(&config.path).await.into(),
    };

    let sensor = AdcSensor::new(&config, channel, scheduler, bus, persister).inspect_err(|e| {
        error!(sensor = %config.name, error = %e, "Failed to create sensor");
    })?;
    Ok(sensor.run(cancel).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensord_bus::MemoryBus;
    use sensord_bus::mock::MockPersister;
    use sensord_hardware::mock::{InstantScheduler, MockChannel};

    fn manager(bus: Arc<MemoryBus>) -> SensorManager<InstantScheduler> {
        SensorManager::new(InstantScheduler::new(), bus, Arc::new(MockPersister::new()))
    }

    #[test]
    fn test_register_counts_sensors() {
        let mut manager = manager(Arc::new(MemoryBus::new()));
        assert_eq!(manager.sensor_count(), 0);

        manager.register(SensorConfig::new("P12V", "/nonexistent/in1_input", "cfg/P12V"));
        let (channel, _handle) = MockChannel::new("/dev/mock");
        manager.register_with_channel(
            SensorConfig::new("P5V", "/dev/mock", "cfg/P5V"),
            channel.into(),
        );

        assert_eq!(manager.sensor_count(), 2);
    }

    #[test]
    fn test_classify_task_result() {
        assert_eq!(
            SensorManagerHandle::classify_task_result(Ok(Ok(RunExit::Cancelled))),
            TaskTermination::Success
        );
        assert_eq!(
            SensorManagerHandle::classify_task_result(Ok(Err(crate::SensorError::Config(
                sensord_core::Error::InvalidScaleFactor(0.0)
            )))),
            TaskTermination::Error
        );
    }

    #[tokio::test]
    async fn test_shutdown_with_no_sensors() {
        let handle = manager(Arc::new(MemoryBus::new())).start();
        assert_eq!(handle.sensor_count(), 0);

        let report = handle.shutdown().await;
        assert_eq!(report, ShutdownReport::default());
    }

    #[tokio::test]
    async fn test_invalid_sensor_is_reported() {
        let bus = Arc::new(MemoryBus::new());
        let mut manager = manager(bus.clone());
        let (channel, _handle) = MockChannel::new("/dev/mock");
        manager.register_with_channel(
            SensorConfig::new("P12V", "/dev/mock", "cfg/P12V").with_scale_factor(0.0),
            channel.into(),
        );

        let report = manager.start().shutdown().await;

        assert_eq!(report.failed, 1);
        assert_eq!(report.total(), 1);
        assert_eq!(bus.interface_count(), 0);
    }
}
