// ── Entry bootstrap ──
//
// Turns a config entry into live devices: pick the discovery source
// (local cache vs cloud), then ingest the records into the registry and
// the notifier. The host calls this once per entry setup, before
// starting the session.

use std::sync::Arc;

use secrecy::SecretString;
use tracing::{debug, warn};

use lanlink_api::{AppCredentials, CloudClient, DeviceRecord, DiscoveryCache, perform_discovery};
use lanlink_core::{Device, DeviceRegistry, LanCredentials, Notifier};

use crate::error::SessionError;

/// Fetch device records for an entry.
///
/// With `prefer_local` set and a readable cache present, the cache wins
/// and the cloud is not contacted. Otherwise the cloud is queried, and --
/// in local mode -- the fresh result is written back to the cache so the
/// next restart works offline. An unreadable cache falls back to the
/// cloud rather than failing the entry.
pub async fn load_device_records(
    client: &CloudClient,
    app: &AppCredentials,
    username: &str,
    password: &SecretString,
    cache: Option<&DiscoveryCache>,
    prefer_local: bool,
) -> Result<Vec<DeviceRecord>, SessionError> {
    if prefer_local {
        if let Some(cache) = cache {
            if cache.exists() {
                match cache.load() {
                    Ok(cached) => {
                        debug!(
                            count = cached.devices.len(),
                            fetched_at = %cached.fetched_at,
                            "reading devices from local cache"
                        );
                        return Ok(cached.devices);
                    }
                    Err(e) => {
                        warn!(error = %e, "local cache unreadable; falling back to cloud discovery");
                    }
                }
            }
        }
    }

    debug!("reading devices from cloud discovery");
    let records = perform_discovery(client, app, username, password).await?;

    if prefer_local {
        if let Some(cache) = cache {
            if let Err(e) = cache.store(&records) {
                warn!(error = %e, "failed to persist discovery result to local cache");
            }
        }
    }

    Ok(records)
}

/// Ingest discovery records: create a `Device` per record, register it
/// with the registry and the notifier.
///
/// A record with an unparseable LAN address is skipped with a warning --
/// one broken record must not sink the rest of the entry.
pub fn ingest_discovery(
    records: Vec<DeviceRecord>,
    registry: &DeviceRegistry,
    notifier: &dyn Notifier,
) -> Vec<Arc<Device>> {
    let mut devices = Vec::with_capacity(records.len());

    for record in records {
        let lan_ip = match record.lan_ip.parse() {
            Ok(ip) => ip,
            Err(_) => {
                warn!(
                    device = %record.name,
                    lan_ip = %record.lan_ip,
                    "discovery record has an invalid LAN address; skipping"
                );
                continue;
            }
        };

        let device = Arc::new(Device::new(
            record.name,
            lan_ip,
            record.mac,
            LanCredentials::new(record.lan_ip_key, record.lan_ip_key_id),
        ));
        debug!(device = device.name(), ip = %lan_ip, "adding device");

        registry.insert(Arc::clone(&device));
        notifier.register_device(Arc::clone(&device));
        devices.push(device);
    }

    devices
}
