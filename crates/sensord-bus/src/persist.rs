//! Persistence backends that do not need an external service.

use tracing::info;

use crate::traits::ThresholdPersister;
use crate::types::PersistRequest;

/// Persister that only records the request in the log.
///
/// Used by the daemon when no configuration store is wired in; threshold
/// writes still take effect for the lifetime of the process.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingPersister;

impl ThresholdPersister for LoggingPersister {
    fn persist(&self, request: PersistRequest) {
        info!(
            configuration = %request.configuration,
            interface = %request.interface,
            threshold = %request.threshold.key(),
            value = request.threshold.value,
            "Threshold persistence requested"
        );
    }
}
