//! Collaborator contracts for the property bus and threshold persistence.
//!
//! Both collaborators are fire-and-forget from the sensor's point of view:
//! calls return immediately and never suspend the sensor task. This keeps
//! them object-safe, so sensors hold them as `Arc<dyn PropertyBus>` and
//! `Arc<dyn ThresholdPersister>` and tests swap in in-memory versions.

use crate::error::Result;
use crate::types::{InterfaceHandle, PersistRequest, PropertyValue, WriteSink};

/// Publish/subscribe object model keyed by object path and interface name.
///
/// The lifecycle of an interface is: [`add_interface`](Self::add_interface),
/// register its properties, [`initialize`](Self::initialize) to make it
/// visible, [`set_property`](Self::set_property) for updates, and finally
/// [`remove_interface`](Self::remove_interface).
pub trait PropertyBus: Send + Sync {
    /// Create an interface at `path`.
    fn add_interface(&self, path: &str, interface: &str) -> Result<InterfaceHandle>;

    /// Register a read-only property with its initial value.
    fn register_property(
        &self,
        iface: &InterfaceHandle,
        name: &str,
        value: PropertyValue,
    ) -> Result<()>;

    /// Register a property that external clients may write.
    ///
    /// Accepted writes are stored and forwarded to `sink`.
    fn register_writable(
        &self,
        iface: &InterfaceHandle,
        name: &str,
        value: PropertyValue,
        sink: WriteSink,
    ) -> Result<()>;

    /// Publish an interface once all its properties are registered.
    fn initialize(&self, iface: &InterfaceHandle) -> Result<()>;

    /// Update a property and notify subscribers.
    fn set_property(&self, iface: &InterfaceHandle, name: &str, value: PropertyValue)
    -> Result<()>;

    /// Withdraw an interface and all its properties.
    fn remove_interface(&self, iface: &InterfaceHandle);
}

/// Backend that stores threshold changes made over the bus.
pub trait ThresholdPersister: Send + Sync {
    fn persist(&self, request: PersistRequest);
}
