// ── Property change dispatcher ──
//
// Observer registry mapping device identity to an ordered list of change
// listeners. `notify` commits the mutation to the device's property store
// first, then fans out to listeners; a failing listener never blocks the
// rest and never unwinds the committed write.

use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::Device;

/// A registered observer of one device's property changes.
///
/// Listeners hold no ownership of the device; the registry keys them by
/// device name only. `on_change` runs synchronously on the notifying
/// task, so implementations should hand heavy work off elsewhere.
pub trait PropertyListener: Send + Sync {
    fn on_change(&self, device: &Device, name: &str, value: &Value) -> Result<(), CoreError>;
}

/// Observer registry + notification fan-out for one config entry.
pub struct PropertyDispatcher {
    /// Device name -> listeners in registration order. The inner mutex is
    /// held only for registry access; listener lists are cloned out
    /// before dispatch so a slow listener never blocks registration.
    listeners: DashMap<String, Mutex<Vec<Arc<dyn PropertyListener>>>>,
}

impl PropertyDispatcher {
    pub fn new() -> Self {
        Self {
            listeners: DashMap::new(),
        }
    }

    /// Register a listener for a device. Listeners fire in registration
    /// order; registering the same listener twice fires it twice.
    pub fn register(&self, device_name: &str, listener: Arc<dyn PropertyListener>) {
        self.listeners
            .entry(device_name.to_owned())
            .or_default()
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(listener);
        debug!(device = device_name, "property listener registered");
    }

    /// Drop all listeners for a device (entry teardown).
    pub fn unregister_all(&self, device_name: &str) {
        self.listeners.remove(device_name);
    }

    /// Number of listeners currently registered for a device.
    pub fn listener_count(&self, device_name: &str) -> usize {
        self.listeners.get(device_name).map_or(0, |entry| {
            entry
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .len()
        })
    }

    /// Apply a property mutation and notify the device's listeners.
    ///
    /// The store write commits before any listener observes the call, so
    /// a listener reading the store sees at least the value it was
    /// notified with. Listener failures are logged and isolated; the
    /// remaining listeners still run.
    pub fn notify(&self, device: &Device, name: &str, value: &Value) {
        device.properties().set(name, value.clone());

        let to_notify: Vec<Arc<dyn PropertyListener>> =
            self.listeners.get(device.name()).map_or_else(Vec::new, |entry| {
                entry
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .clone()
            });

        for listener in to_notify {
            if let Err(e) = listener.on_change(device, name, value) {
                warn!(
                    device = device.name(),
                    property = name,
                    error = %e,
                    "property listener failed; continuing with remaining listeners"
                );
            }
        }
    }
}

impl Default for PropertyDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
