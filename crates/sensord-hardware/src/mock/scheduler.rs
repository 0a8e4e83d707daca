//! Scheduler that never waits.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::traits::Scheduler;

/// Scheduler that returns immediately and records every requested delay.
///
/// Each sleep still yields once to the runtime, so a sensor loop driven by
/// it lets other tasks (and test assertions) make progress between cycles.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use sensord_hardware::Scheduler;
/// use sensord_hardware::mock::InstantScheduler;
///
/// #[tokio::main]
/// async fn main() {
///     let scheduler = InstantScheduler::new();
///     scheduler.sleep(Duration::from_millis(500)).await;
///     assert_eq!(scheduler.sleeps(), vec![Duration::from_millis(500)]);
/// }
/// ```
#[derive(Debug, Default, Clone)]
pub struct InstantScheduler {
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl InstantScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays requested so far, oldest first.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Scheduler for InstantScheduler {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        self.sleeps
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(duration);
        tokio::task::yield_now()
    }
}
