//! Scheduler backed by the Tokio timer.

use std::future::Future;
use std::time::Duration;

use crate::traits::Scheduler;

/// Scheduler that sleeps on the Tokio runtime's timer.
///
/// Under `tokio::time::pause` the sleeps auto-advance, which is how the
/// integration tests drive a full sensor loop quickly.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}
