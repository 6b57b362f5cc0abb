// ── Per-device property table ──
//
// Lock-free storage for the mutable property state a device reports over
// the push protocol. Mutations bump a version counter broadcast via a
// `watch` channel so readers can observe change without polling.

use std::collections::HashMap;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::watch;

/// Mutable property table for a single device.
///
/// Keys are the protocol-level property names (e.g. `"t_power"`), values
/// are the raw JSON values the device reported. Readers get eventual,
/// post-notify visibility only: a snapshot taken between two reports may
/// be stale by the time it is used.
#[derive(Debug)]
pub struct PropertyStore {
    values: DashMap<String, Value>,
    /// Bumped on every mutation.
    version: watch::Sender<u64>,
}

impl PropertyStore {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        Self {
            values: DashMap::new(),
            version,
        }
    }

    /// Set a property, returning the previous value if one existed.
    pub fn set(&self, name: &str, value: Value) -> Option<Value> {
        let previous = self.values.insert(name.to_owned(), value);
        self.version.send_modify(|v| *v += 1);
        previous
    }

    /// Current value of a property, if the device has ever reported it.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.values.get(name).map(|r| r.value().clone())
    }

    /// Snapshot of the full table. Insertion order is not meaningful.
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.values
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect()
    }

    /// Subscribe to the mutation counter.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Default for PropertyStore {
    fn default() -> Self {
        Self::new()
    }
}
