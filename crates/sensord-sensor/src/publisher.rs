//! Bus-facing state of a sensor.
//!
//! A [`SensorPublisher`] owns everything a bus client can see for one
//! sensor: the current value, the display range, the thresholds and their
//! alarms. It registers those properties at construction, republishes the
//! value on every update, flips alarm properties when a threshold is
//! crossed, and withdraws everything when dropped.
//!
//! # Property Layout
//!
//! | Interface | Property | Access |
//! |-----------|----------|--------|
//! | `Sensor.Value` | `Value`, `MinValue`, `MaxValue` | read |
//! | `Sensor.Threshold.Warning` | `WarningHigh`, `WarningLow` | read/write |
//! | `Sensor.Threshold.Warning` | `WarningAlarmHigh`, `WarningAlarmLow` | read |
//! | `Sensor.Threshold.Critical` | `CriticalHigh`, `CriticalLow` | read/write |
//! | `Sensor.Threshold.Critical` | `CriticalAlarmHigh`, `CriticalAlarmLow` | read |
//!
//! A threshold group is registered only if the sensor has at least one
//! threshold of that level.

use std::fmt;
use std::sync::Arc;

use sensord_bus::{
    InterfaceHandle, PersistRequest, PropertyBus, PropertyValue, ThresholdPersister,
    ThresholdWrite, WriteSink,
};
use sensord_core::constants::{
    PROPERTY_MAX_VALUE, PROPERTY_MIN_VALUE, PROPERTY_VALUE, VALUE_INTERFACE,
};
use sensord_core::{SensorConfig, Threshold, ThresholdKey, ThresholdLevel};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::error::Result;

/// Bus properties backing one threshold.
#[derive(Debug, Clone)]
struct ThresholdProperties {
    iface: InterfaceHandle,
    value_property: &'static str,
    alarm_property: &'static str,
}

/// A threshold together with where it is published.
///
/// `properties` is `None` when the threshold's group could not be
/// registered; the threshold is still evaluated but nothing is published.
#[derive(Debug)]
struct ThresholdSlot {
    threshold: Threshold,
    properties: Option<ThresholdProperties>,
}

/// Externally visible state of one sensor.
pub struct SensorPublisher {
    name: String,
    configuration: String,
    config_interface: &'static str,
    bus: Arc<dyn PropertyBus>,
    persister: Arc<dyn ThresholdPersister>,
    value: f64,
    min_value: f64,
    max_value: f64,
    slots: Vec<ThresholdSlot>,
    value_iface: Option<InterfaceHandle>,
    warning_iface: Option<InterfaceHandle>,
    critical_iface: Option<InterfaceHandle>,
}

impl SensorPublisher {
    /// Register all properties of the sensor on `bus`.
    ///
    /// Failing to add the value interface is an error. A failed threshold
    /// group is logged and its thresholds stay unpublished.
    pub fn new(
        config: &SensorConfig,
        thresholds: Vec<Threshold>,
        bus: Arc<dyn PropertyBus>,
        persister: Arc<dyn ThresholdPersister>,
        writes: mpsc::UnboundedSender<ThresholdWrite>,
    ) -> Result<Self> {
        let path = config.object_path();
        let value_iface = bus.add_interface(&path, VALUE_INTERFACE)?;

        let warning_iface =
            Self::add_group(bus.as_ref(), &path, &thresholds, ThresholdLevel::Warning);
        let critical_iface =
            Self::add_group(bus.as_ref(), &path, &thresholds, ThresholdLevel::Critical);

        let mut publisher = Self {
            name: config.name.clone(),
            configuration: config.configuration.clone(),
            config_interface: config.kind.configuration_interface(),
            bus,
            persister,
            value: f64::NAN,
            min_value: config.min_value,
            max_value: config.max_value,
            slots: Vec::with_capacity(thresholds.len()),
            value_iface: Some(value_iface),
            warning_iface,
            critical_iface,
        };

        publisher.register_properties(thresholds, &writes);
        publisher.initialize_interfaces();
        Ok(publisher)
    }

    fn add_group(
        bus: &dyn PropertyBus,
        path: &str,
        thresholds: &[Threshold],
        level: ThresholdLevel,
    ) -> Option<InterfaceHandle> {
        if !thresholds.iter().any(|t| t.level == level) {
            return None;
        }
        match bus.add_interface(path, level.interface()) {
            Ok(iface) => Some(iface),
            Err(e) => {
                error!(path, level = %level, error = %e, "Failed to add threshold interface");
                None
            }
        }
    }

    fn group(&self, level: ThresholdLevel) -> Option<&InterfaceHandle> {
        match level {
            ThresholdLevel::Warning => self.warning_iface.as_ref(),
            ThresholdLevel::Critical => self.critical_iface.as_ref(),
        }
    }

    fn register_properties(
        &mut self,
        thresholds: Vec<Threshold>,
        writes: &mpsc::UnboundedSender<ThresholdWrite>,
    ) {
        if let Some(iface) = &self.value_iface {
            let initial = [
                (PROPERTY_MAX_VALUE, self.max_value),
                (PROPERTY_MIN_VALUE, self.min_value),
                (PROPERTY_VALUE, self.value),
            ];
            for (name, value) in initial {
                if let Err(e) = self.bus.register_property(iface, name, value.into()) {
                    error!(
                        sensor = %self.name,
                        property = name,
                        error = %e,
                        "Failed to register property"
                    );
                }
            }
        }

        for threshold in thresholds {
            let key = threshold.key();
            let properties = match self.group(key.level) {
                Some(iface) => {
                    let properties = ThresholdProperties {
                        iface: iface.clone(),
                        value_property: key.value_property(),
                        alarm_property: key.alarm_property(),
                    };
                    self.register_threshold(&properties, &threshold, writes);
                    Some(properties)
                }
                None => {
                    warn!(
                        sensor = %self.name,
                        threshold = %key,
                        "Trying to set uninitialized interface"
                    );
                    None
                }
            };
            self.slots.push(ThresholdSlot {
                threshold,
                properties,
            });
        }
    }

    fn register_threshold(
        &self,
        properties: &ThresholdProperties,
        threshold: &Threshold,
        writes: &mpsc::UnboundedSender<ThresholdWrite>,
    ) {
        let sink = WriteSink::new(threshold.key(), writes.clone());
        if let Err(e) = self.bus.register_writable(
            &properties.iface,
            properties.value_property,
            threshold.value.into(),
            sink,
        ) {
            error!(
                sensor = %self.name,
                property = properties.value_property,
                error = %e,
                "Failed to register threshold"
            );
        }
        if let Err(e) =
            self.bus
                .register_property(&properties.iface, properties.alarm_property, false.into())
        {
            error!(
                sensor = %self.name,
                property = properties.alarm_property,
                error = %e,
                "Failed to register alarm"
            );
        }
    }

    fn initialize_interfaces(&self) {
        let ifaces = [&self.value_iface, &self.warning_iface, &self.critical_iface];
        for iface in ifaces.into_iter().flatten() {
            if let Err(e) = self.bus.initialize(iface) {
                error!(
                    sensor = %self.name,
                    interface = %iface.interface,
                    error = %e,
                    "Error initializing interface"
                );
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Latest accepted value. NaN until the first update.
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn min_value(&self) -> f64 {
        self.min_value
    }

    pub fn max_value(&self) -> f64 {
        self.max_value
    }

    /// Alarm state of the threshold with `key`, if configured.
    pub fn alarm(&self, key: ThresholdKey) -> Option<bool> {
        self.slot(key).map(|slot| slot.threshold.is_asserted())
    }

    /// Crossing point of the threshold with `key`, if configured.
    pub fn threshold_value(&self, key: ThresholdKey) -> Option<f64> {
        self.slot(key).map(|slot| slot.threshold.value)
    }

    /// Keys of the configured thresholds, in configuration order.
    pub fn threshold_keys(&self) -> Vec<ThresholdKey> {
        self.slots.iter().map(|slot| slot.threshold.key()).collect()
    }

    fn slot(&self, key: ThresholdKey) -> Option<&ThresholdSlot> {
        self.slots.iter().find(|slot| slot.threshold.key() == key)
    }

    /// Store a new value, publish it, and re-evaluate every threshold.
    ///
    /// `Value` is published on every call, whether or not an alarm changes.
    pub fn update(&mut self, new_value: f64) {
        self.value = new_value;

        if let Some(iface) = &self.value_iface
            && let Err(e) = self
                .bus
                .set_property(iface, PROPERTY_VALUE, PropertyValue::Double(new_value))
        {
            warn!(sensor = %self.name, error = %e, "Failed to publish value");
        }

        self.evaluate_thresholds();
    }

    /// Bring every alarm in line with the current value.
    ///
    /// Only alarms whose state changes are published, so calling this
    /// twice without an update in between publishes nothing the second
    /// time.
    pub fn evaluate_thresholds(&mut self) {
        let value = self.value;
        for slot in &mut self.slots {
            let Some(asserted) = slot.threshold.assess(value) else {
                continue;
            };

            let key = slot.threshold.key();
            let Some(properties) = &slot.properties else {
                warn!(
                    sensor = %self.name,
                    threshold = %key,
                    "Trying to set uninitialized interface"
                );
                continue;
            };

            debug!(sensor = %self.name, threshold = %key, asserted, value, "Alarm changed");
            if let Err(e) = self.bus.set_property(
                &properties.iface,
                properties.alarm_property,
                PropertyValue::Bool(asserted),
            ) {
                warn!(sensor = %self.name, threshold = %key, error = %e, "Failed to publish alarm");
            }
        }
    }

    /// Record a threshold value written over the bus and request persistence.
    ///
    /// The write is never rejected for range. The new value takes effect at
    /// the next evaluation. Returns `false` only when no threshold with
    /// `key` was ever registered, in which case the write is ignored.
    pub fn on_threshold_write(&mut self, key: ThresholdKey, requested: f64) -> bool {
        let Some(slot) = self
            .slots
            .iter_mut()
            .find(|slot| slot.threshold.key() == key && slot.properties.is_some())
        else {
            warn!(
                sensor = %self.name,
                threshold = %key,
                "Ignoring write to uninitialized interface"
            );
            return false;
        };

        slot.threshold.value = requested;
        info!(sensor = %self.name, threshold = %key, value = requested, "Threshold updated");

        self.persister.persist(PersistRequest {
            configuration: self.configuration.clone(),
            interface: self.config_interface.to_string(),
            threshold: slot.threshold.clone(),
        });
        true
    }

    /// Apply a write queued by the bus.
    pub fn apply_write(&mut self, write: ThresholdWrite) -> bool {
        self.on_threshold_write(write.key, write.value)
    }

    /// Remove every interface this sensor registered.
    ///
    /// Safe to call more than once and before any value was produced.
    pub fn withdraw(&mut self) {
        let ifaces = [
            self.warning_iface.take(),
            self.critical_iface.take(),
            self.value_iface.take(),
        ];
        for iface in ifaces.into_iter().flatten() {
            self.bus.remove_interface(&iface);
        }
        for slot in &mut self.slots {
            slot.properties = None;
        }
    }

    /// Whether the properties are still registered.
    pub fn is_published(&self) -> bool {
        self.value_iface.is_some()
    }
}

impl Drop for SensorPublisher {
    fn drop(&mut self) {
        self.withdraw();
    }
}

impl fmt::Debug for SensorPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensorPublisher")
            .field("name", &self.name)
            .field("value", &self.value)
            .field("slots", &self.slots)
            .field("published", &self.is_published())
            .finish_non_exhaustive()
    }
}
