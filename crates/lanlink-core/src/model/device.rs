// ── Device model ──
//
// A LAN device as created from a discovery record: identity, session
// credentials for the key exchange, its property table, and an observable
// availability flag. Devices are shared as `Arc<Device>`; the registry and
// the dispatcher both refer to them by name, never by ownership.

use std::net::IpAddr;

use secrecy::SecretString;
use tokio::sync::watch;

use super::property::PropertyStore;

/// LAN session credentials handed out by the cloud at discovery time.
///
/// The key itself never appears in logs or `Debug` output; the key id is
/// what the device quotes during the key exchange.
#[derive(Debug, Clone)]
pub struct LanCredentials {
    pub key: SecretString,
    pub key_id: i64,
}

impl LanCredentials {
    pub fn new(key: impl Into<String>, key_id: i64) -> Self {
        Self {
            key: SecretString::from(key.into()),
            key_id,
        }
    }
}

/// A single LAN device and its live state.
#[derive(Debug)]
pub struct Device {
    name: String,
    lan_ip: IpAddr,
    mac: String,
    credentials: LanCredentials,
    properties: PropertyStore,
    available: watch::Sender<bool>,
}

impl Device {
    /// Create a device from its discovery-time attributes.
    ///
    /// New devices start unavailable; the first decoded inbound report
    /// flips the flag.
    pub fn new(
        name: impl Into<String>,
        lan_ip: IpAddr,
        mac: impl Into<String>,
        credentials: LanCredentials,
    ) -> Self {
        let (available, _) = watch::channel(false);
        Self {
            name: name.into(),
            lan_ip,
            mac: mac.into(),
            credentials,
            properties: PropertyStore::new(),
            available,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lan_ip(&self) -> IpAddr {
        self.lan_ip
    }

    pub fn mac(&self) -> &str {
        &self.mac
    }

    pub fn credentials(&self) -> &LanCredentials {
        &self.credentials
    }

    pub fn properties(&self) -> &PropertyStore {
        &self.properties
    }

    // ── Availability ─────────────────────────────────────────────────

    pub fn is_available(&self) -> bool {
        *self.available.borrow()
    }

    /// Flip the availability flag. Subscribers are only woken when the
    /// value actually changes.
    pub fn set_available(&self, available: bool) {
        self.available.send_if_modified(|current| {
            let changed = *current != available;
            *current = available;
            changed
        });
    }

    /// Subscribe to availability transitions.
    pub fn subscribe_availability(&self) -> watch::Receiver<bool> {
        self.available.subscribe()
    }
}
