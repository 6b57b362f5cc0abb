// ── Persisted discovery cache ──
//
// JSON file holding the last successful discovery result. In local-device
// mode the cache is read instead of re-querying the cloud, so a restart
// works with the cloud unreachable.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::discovery::DeviceRecord;
use crate::error::ApiError;

/// On-disk shape of the cache file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedDiscovery {
    pub fetched_at: DateTime<Utc>,
    pub devices: Vec<DeviceRecord>,
}

/// Handle to the discovery cache file for one config entry.
#[derive(Debug, Clone)]
pub struct DiscoveryCache {
    path: PathBuf,
}

impl DiscoveryCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the cached discovery result.
    pub fn load(&self) -> Result<CachedDiscovery, ApiError> {
        let contents = std::fs::read_to_string(&self.path)?;
        let cached: CachedDiscovery = serde_json::from_str(&contents)?;
        debug!(
            path = %self.path.display(),
            count = cached.devices.len(),
            "discovery result read from local cache"
        );
        Ok(cached)
    }

    /// Persist a discovery result, stamping it with the current time.
    pub fn store(&self, devices: &[DeviceRecord]) -> Result<(), ApiError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let cached = CachedDiscovery {
            fetched_at: Utc::now(),
            devices: devices.to_vec(),
        };
        std::fs::write(&self.path, serde_json::to_string(&cached)?)?;
        debug!(path = %self.path.display(), "discovery result cached");
        Ok(())
    }

    /// Delete the cache file (entry removal). Missing file is not an error.
    pub fn remove(&self) -> Result<(), ApiError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(name: &str) -> DeviceRecord {
        DeviceRecord {
            name: name.into(),
            lan_ip: "192.168.1.40".into(),
            lan_ip_key: "k".into(),
            lan_ip_key_id: 11,
            mac: "aa:bb:cc:dd:ee:ff".into(),
        }
    }

    #[test]
    fn store_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiscoveryCache::new(dir.path().join("devices.json"));

        cache.store(&[record("ac-1"), record("ac-2")]).unwrap();
        assert!(cache.exists());

        let loaded = cache.load().unwrap();
        assert_eq!(loaded.devices.len(), 2);
        assert_eq!(loaded.devices[0].name, "ac-1");
        assert_eq!(loaded.devices[0].lan_ip_key_id, 11);
    }

    #[test]
    fn load_accepts_wire_spellings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.json");
        std::fs::write(
            &path,
            r#"{"fetched_at":"2026-01-10T08:00:00Z","devices":[{"product_name":"ac-1","lan_ip":"10.0.0.2","lanip_key":"k","lanip_key_id":3,"mac":"aa:bb:cc:dd:ee:ff"}]}"#,
        )
        .unwrap();

        let loaded = DiscoveryCache::new(&path).load().unwrap();
        assert_eq!(loaded.devices[0].name, "ac-1");
        assert_eq!(loaded.devices[0].lan_ip_key, "k");
    }

    #[test]
    fn missing_file_fails_load_but_not_remove() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiscoveryCache::new(dir.path().join("absent.json"));

        assert!(!cache.exists());
        assert!(matches!(cache.load(), Err(ApiError::Io(_))));
        cache.remove().unwrap();
    }
}
