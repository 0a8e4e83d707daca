//! In-process property bus.
//!
//! [`MemoryBus`] keeps every interface and property in memory and records
//! each property change in order. The daemon uses it when no external bus
//! transport is wired in, and the test suites use it to observe exactly
//! what a sensor published.
//!
//! # Examples
//!
//! ```
//! use sensord_bus::{MemoryBus, PropertyBus, PropertyValue};
//!
//! let bus = MemoryBus::new();
//! let iface = bus.add_interface("/sensors/voltage/P5V", "x.Sensor.Value").unwrap();
//! bus.register_property(&iface, "Value", PropertyValue::Double(f64::NAN)).unwrap();
//! bus.initialize(&iface).unwrap();
//!
//! bus.set_property(&iface, "Value", 5.02.into()).unwrap();
//! assert_eq!(
//!     bus.get("/sensors/voltage/P5V", "x.Sensor.Value", "Value"),
//!     Some(PropertyValue::Double(5.02)),
//! );
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, trace};

use crate::error::{BusError, Result};
use crate::traits::PropertyBus;
use crate::types::{InterfaceHandle, PropertyValue, WriteSink};

/// One recorded property change.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyChange {
    pub path: String,
    pub interface: String,
    pub property: String,
    pub value: PropertyValue,
}

#[derive(Debug)]
struct Property {
    value: PropertyValue,
    sink: Option<WriteSink>,
}

#[derive(Debug)]
struct Interface {
    path: String,
    name: String,
    properties: BTreeMap<String, Property>,
    initialized: bool,
}

#[derive(Debug, Default)]
struct BusState {
    next_id: u64,
    interfaces: HashMap<u64, Interface>,
    changes: Vec<PropertyChange>,
    failing: HashSet<String>,
}

/// Property bus held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryBus {
    state: Mutex<BusState>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make every later `add_interface` for `interface` fail.
    pub fn fail_interface(&self, interface: impl Into<String>) {
        self.state().failing.insert(interface.into());
    }

    /// Current value of a property on an initialized interface.
    pub fn get(&self, path: &str, interface: &str, property: &str) -> Option<PropertyValue> {
        let state = self.state();
        state
            .interfaces
            .values()
            .find(|i| i.path == path && i.name == interface && i.initialized)
            .and_then(|i| i.properties.get(property))
            .map(|p| p.value)
    }

    /// Names of the initialized interfaces at `path`, sorted.
    pub fn interfaces_at(&self, path: &str) -> Vec<String> {
        let state = self.state();
        let mut names: Vec<String> = state
            .interfaces
            .values()
            .filter(|i| i.path == path && i.initialized)
            .map(|i| i.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Number of interfaces currently registered, initialized or not.
    pub fn interface_count(&self) -> usize {
        self.state().interfaces.len()
    }

    /// Every change published through `set_property`, oldest first.
    pub fn changes(&self) -> Vec<PropertyChange> {
        self.state().changes.clone()
    }

    /// Values published for one property name, oldest first.
    pub fn changes_for(&self, property: &str) -> Vec<PropertyValue> {
        self.state()
            .changes
            .iter()
            .filter(|c| c.property == property)
            .map(|c| c.value)
            .collect()
    }

    pub fn clear_changes(&self) {
        self.state().changes.clear();
    }

    /// Deliver a write from an external client.
    ///
    /// Returns `Ok(true)` when the write was accepted and forwarded to the
    /// owning sensor. The stored value is updated once the owner has the
    /// request, the way a bus reflects an accepted write back to readers.
    /// A rejected write leaves the stored value untouched.
    pub fn write(
        &self,
        path: &str,
        interface: &str,
        property: &str,
        value: PropertyValue,
    ) -> Result<bool> {
        {
            let mut state = self.state();
            let iface = state
                .interfaces
                .values_mut()
                .find(|i| i.path == path && i.name == interface && i.initialized)
                .ok_or_else(|| BusError::interface_not_found(path, interface))?;

            let prop = iface
                .properties
                .get_mut(property)
                .ok_or_else(|| BusError::property_not_found(property))?;

            let Some(sink) = prop.sink.as_ref() else {
                return Err(BusError::PropertyReadOnly {
                    property: property.to_string(),
                });
            };

            if !prop.value.same_type(&value) {
                return Err(BusError::TypeMismatch {
                    property: property.to_string(),
                });
            }

            let requested = value.as_f64().unwrap_or(f64::NAN);
            if !sink.submit(requested) {
                return Err(BusError::write_rejected(format!(
                    "owner of {} at {} is gone",
                    property, path
                )));
            }
            prop.value = value;
        }

        debug!(path, interface, property, %value, "External property write accepted");
        Ok(true)
    }
}

impl PropertyBus for MemoryBus {
    fn add_interface(&self, path: &str, interface: &str) -> Result<InterfaceHandle> {
        let mut state = self.state();

        if state.failing.contains(interface) {
            return Err(BusError::initialization_failed(format!(
                "cannot add {} at {}",
                interface, path
            )));
        }

        state.next_id += 1;
        let id = state.next_id;
        state.interfaces.insert(
            id,
            Interface {
                path: path.to_string(),
                name: interface.to_string(),
                properties: BTreeMap::new(),
                initialized: false,
            },
        );

        trace!(id, path, interface, "Interface added");
        Ok(InterfaceHandle {
            id,
            path: path.to_string(),
            interface: interface.to_string(),
        })
    }

    fn register_property(
        &self,
        iface: &InterfaceHandle,
        name: &str,
        value: PropertyValue,
    ) -> Result<()> {
        let mut state = self.state();
        let entry = state
            .interfaces
            .get_mut(&iface.id)
            .ok_or_else(|| BusError::interface_not_found(&iface.path, &iface.interface))?;
        entry
            .properties
            .insert(name.to_string(), Property { value, sink: None });
        Ok(())
    }

    fn register_writable(
        &self,
        iface: &InterfaceHandle,
        name: &str,
        value: PropertyValue,
        sink: WriteSink,
    ) -> Result<()> {
        let mut state = self.state();
        let entry = state
            .interfaces
            .get_mut(&iface.id)
            .ok_or_else(|| BusError::interface_not_found(&iface.path, &iface.interface))?;
        entry.properties.insert(
            name.to_string(),
            Property {
                value,
                sink: Some(sink),
            },
        );
        Ok(())
    }

    fn initialize(&self, iface: &InterfaceHandle) -> Result<()> {
        let mut state = self.state();
        let entry = state
            .interfaces
            .get_mut(&iface.id)
            .ok_or_else(|| BusError::interface_not_found(&iface.path, &iface.interface))?;
        entry.initialized = true;
        Ok(())
    }

    fn set_property(
        &self,
        iface: &InterfaceHandle,
        name: &str,
        value: PropertyValue,
    ) -> Result<()> {
        let mut state = self.state();
        let entry = state
            .interfaces
            .get_mut(&iface.id)
            .ok_or_else(|| BusError::interface_not_found(&iface.path, &iface.interface))?;
        let prop = entry
            .properties
            .get_mut(name)
            .ok_or_else(|| BusError::property_not_found(name))?;

        if !prop.value.same_type(&value) {
            return Err(BusError::TypeMismatch {
                property: name.to_string(),
            });
        }
        prop.value = value;

        let change = PropertyChange {
            path: entry.path.clone(),
            interface: entry.name.clone(),
            property: name.to_string(),
            value,
        };
        state.changes.push(change);
        Ok(())
    }

    fn remove_interface(&self, iface: &InterfaceHandle) {
        if self.state().interfaces.remove(&iface.id).is_some() {
            trace!(path = %iface.path, interface = %iface.interface, "Interface removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensord_core::{ThresholdDirection, ThresholdKey, ThresholdLevel};
    use tokio::sync::mpsc;

    const PATH: &str = "/xyz/openbmc_project/sensors/voltage/P12V";
    const WARNING: &str = "xyz.openbmc_project.Sensor.Threshold.Warning";

    fn key() -> ThresholdKey {
        ThresholdKey::new(ThresholdLevel::Warning, ThresholdDirection::High)
    }

    #[test]
    fn test_uninitialized_interface_is_invisible() {
        let bus = MemoryBus::new();
        let iface = bus.add_interface(PATH, WARNING).unwrap();
        bus.register_property(&iface, "WarningAlarmHigh", false.into())
            .unwrap();

        assert_eq!(bus.get(PATH, WARNING, "WarningAlarmHigh"), None);
        assert!(bus.interfaces_at(PATH).is_empty());

        bus.initialize(&iface).unwrap();
        assert_eq!(
            bus.get(PATH, WARNING, "WarningAlarmHigh"),
            Some(PropertyValue::Bool(false))
        );
        assert_eq!(bus.interfaces_at(PATH), vec![WARNING.to_string()]);
    }

    #[test]
    fn test_set_property_records_change() {
        let bus = MemoryBus::new();
        let iface = bus.add_interface(PATH, WARNING).unwrap();
        bus.register_property(&iface, "WarningAlarmHigh", false.into())
            .unwrap();
        bus.initialize(&iface).unwrap();

        bus.set_property(&iface, "WarningAlarmHigh", true.into())
            .unwrap();

        assert_eq!(
            bus.changes(),
            vec![PropertyChange {
                path: PATH.to_string(),
                interface: WARNING.to_string(),
                property: "WarningAlarmHigh".to_string(),
                value: PropertyValue::Bool(true),
            }]
        );
    }

    #[test]
    fn test_set_property_type_mismatch() {
        let bus = MemoryBus::new();
        let iface = bus.add_interface(PATH, WARNING).unwrap();
        bus.register_property(&iface, "WarningAlarmHigh", false.into())
            .unwrap();

        let err = bus
            .set_property(&iface, "WarningAlarmHigh", 1.0.into())
            .unwrap_err();
        assert!(matches!(err, BusError::TypeMismatch { .. }));
        assert!(bus.changes().is_empty());
    }

    #[test]
    fn test_set_unknown_property() {
        let bus = MemoryBus::new();
        let iface = bus.add_interface(PATH, WARNING).unwrap();
        let err = bus.set_property(&iface, "Nope", 1.0.into()).unwrap_err();
        assert!(matches!(err, BusError::PropertyNotFound { .. }));
    }

    #[tokio::test]
    async fn test_write_forwards_to_sink() {
        let bus = MemoryBus::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let iface = bus.add_interface(PATH, WARNING).unwrap();
        bus.register_writable(&iface, "WarningHigh", 13.0.into(), WriteSink::new(key(), tx))
            .unwrap();
        bus.initialize(&iface).unwrap();

        assert!(bus.write(PATH, WARNING, "WarningHigh", 12.5.into()).unwrap());

        let write = rx.recv().await.unwrap();
        assert_eq!(write.key, key());
        assert_eq!(write.value, 12.5);
        assert_eq!(
            bus.get(PATH, WARNING, "WarningHigh"),
            Some(PropertyValue::Double(12.5))
        );
    }

    #[test]
    fn test_write_read_only_property() {
        let bus = MemoryBus::new();
        let iface = bus.add_interface(PATH, WARNING).unwrap();
        bus.register_property(&iface, "WarningAlarmHigh", false.into())
            .unwrap();
        bus.initialize(&iface).unwrap();

        let err = bus
            .write(PATH, WARNING, "WarningAlarmHigh", true.into())
            .unwrap_err();
        assert!(matches!(err, BusError::PropertyReadOnly { .. }));
    }

    #[test]
    fn test_write_after_owner_dropped() {
        let bus = MemoryBus::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let iface = bus.add_interface(PATH, WARNING).unwrap();
        bus.register_writable(&iface, "WarningHigh", 13.0.into(), WriteSink::new(key(), tx))
            .unwrap();
        bus.initialize(&iface).unwrap();
        drop(rx);

        let err = bus
            .write(PATH, WARNING, "WarningHigh", 12.0.into())
            .unwrap_err();
        assert!(matches!(err, BusError::WriteRejected { .. }));
        assert_eq!(
            bus.get(PATH, WARNING, "WarningHigh"),
            Some(PropertyValue::Double(13.0))
        );
    }

    #[test]
    fn test_fail_interface() {
        let bus = MemoryBus::new();
        bus.fail_interface(WARNING);

        let err = bus.add_interface(PATH, WARNING).unwrap_err();
        assert!(matches!(err, BusError::InitializationFailed { .. }));
        assert_eq!(bus.interface_count(), 0);
    }

    #[test]
    fn test_remove_interface() {
        let bus = MemoryBus::new();
        let iface = bus.add_interface(PATH, WARNING).unwrap();
        bus.initialize(&iface).unwrap();

        bus.remove_interface(&iface);
        assert_eq!(bus.interface_count(), 0);
        assert!(bus.interfaces_at(PATH).is_empty());

        // Removing twice is harmless.
        bus.remove_interface(&iface);
    }
}
