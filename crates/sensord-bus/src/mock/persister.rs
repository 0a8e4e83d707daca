//! Recording persister for tests.

use std::sync::{Arc, Mutex};

use crate::traits::ThresholdPersister;
use crate::types::PersistRequest;

/// Persister that keeps every request it receives.
///
/// Clones share the same record, so a test can hand one clone to a sensor
/// and inspect the other.
///
/// # Examples
///
/// ```
/// use sensord_bus::mock::MockPersister;
/// use sensord_bus::{PersistRequest, ThresholdPersister};
/// use sensord_core::{Threshold, ThresholdDirection, ThresholdLevel};
///
/// let persister = MockPersister::new();
/// persister.persist(PersistRequest {
///     configuration: "cfg/P12V".to_string(),
///     interface: "xyz.openbmc_project.Configuration.ADC".to_string(),
///     threshold: Threshold::new(ThresholdLevel::Warning, ThresholdDirection::High, 13.0),
/// });
///
/// assert_eq!(persister.requests().len(), 1);
/// ```
#[derive(Debug, Default, Clone)]
pub struct MockPersister {
    requests: Arc<Mutex<Vec<PersistRequest>>>,
}

impl MockPersister {
    pub fn new() -> Self {
        Self::default()
    }

    /// All requests received so far, oldest first.
    pub fn requests(&self) -> Vec<PersistRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl ThresholdPersister for MockPersister {
    fn persist(&self, request: PersistRequest) {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request);
    }
}
