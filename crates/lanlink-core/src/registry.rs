// ── Device registry ──
//
// Explicit, host-owned registry of active devices. The push server looks
// devices up by the LAN address they report from; everything else refers
// to them by name. Never a process-global: the host constructs one per
// config entry and passes it to whoever needs it.

use std::net::IpAddr;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

use crate::model::Device;

/// Registry of active devices for one config entry.
///
/// Primary key is the device name; a secondary index maps the device's
/// LAN address back to the name so inbound reports can be associated
/// with their device in O(1).
#[derive(Debug)]
pub struct DeviceRegistry {
    by_name: DashMap<String, Arc<Device>>,
    addr_to_name: DashMap<IpAddr, String>,
    /// Bumped on every insert/remove.
    version: watch::Sender<u64>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        Self {
            by_name: DashMap::new(),
            addr_to_name: DashMap::new(),
            version,
        }
    }

    /// Insert a device. Returns `true` if the name was new.
    ///
    /// Re-inserting an existing name replaces the device and cleans up
    /// the stale address mapping if the LAN address changed.
    pub fn insert(&self, device: Arc<Device>) -> bool {
        let name = device.name().to_owned();

        if let Some(existing) = self.by_name.get(&name) {
            let old_addr = existing.lan_ip();
            if old_addr != device.lan_ip() {
                self.addr_to_name.remove(&old_addr);
            }
        }

        let is_new = !self.by_name.contains_key(&name);
        self.addr_to_name.insert(device.lan_ip(), name.clone());
        self.by_name.insert(name, device);
        self.version.send_modify(|v| *v += 1);

        is_new
    }

    /// Remove a device by name. Returns the removed device if it existed.
    pub fn remove(&self, name: &str) -> Option<Arc<Device>> {
        let removed = self.by_name.remove(name).map(|(_, d)| d);
        if let Some(ref device) = removed {
            self.addr_to_name.remove(&device.lan_ip());
            self.version.send_modify(|v| *v += 1);
        }
        removed
    }

    /// Look up a device by name.
    pub fn get(&self, name: &str) -> Option<Arc<Device>> {
        self.by_name.get(name).map(|r| Arc::clone(r.value()))
    }

    /// Look up a device by the LAN address it reports from.
    pub fn get_by_addr(&self, addr: IpAddr) -> Option<Arc<Device>> {
        let name = self.addr_to_name.get(&addr)?;
        self.by_name
            .get(name.value().as_str())
            .map(|r| Arc::clone(r.value()))
    }

    /// All registered devices, in no particular order.
    pub fn devices(&self) -> Vec<Arc<Device>> {
        self.by_name.iter().map(|r| Arc::clone(r.value())).collect()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Subscribe to membership changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
