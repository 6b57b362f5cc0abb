//! Configuration for lanlink config entries.
//!
//! TOML file + environment layering via figment, validation, and
//! translation to `lanlink_core::StreamSettings`. The host integration
//! layer loads one `Config` per entry and hands the pieces to the
//! bootstrap and session APIs.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use lanlink_core::StreamSettings;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level configuration for one entry.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Cloud account used for device discovery.
    #[serde(default)]
    pub account: AccountConfig,

    /// LAN push-server settings.
    #[serde(default)]
    pub lan: LanConfig,

    /// Stream-endpoint resolution settings.
    #[serde(default)]
    pub stream: StreamConfig,
}

/// Cloud credentials (plaintext here -- prefer the environment for the
/// secrets: `LANLINK_ACCOUNT__PASSWORD`, `LANLINK_ACCOUNT__APP_SECRET`).
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct AccountConfig {
    pub app_id: String,
    pub app_secret: String,
    pub username: String,
    pub password: String,
}

impl AccountConfig {
    pub fn password(&self) -> SecretString {
        SecretString::from(self.password.clone())
    }

    pub fn app_secret(&self) -> SecretString {
        SecretString::from(self.app_secret.clone())
    }
}

/// LAN push-server settings.
#[derive(Debug, Deserialize, Serialize)]
pub struct LanConfig {
    /// Address to bind the push server on.
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Prefer the persisted discovery cache over the cloud.
    #[serde(default)]
    pub local_devices: bool,

    /// Override for the discovery cache file location.
    pub cache_path: Option<PathBuf>,

    #[serde(default = "default_drain_secs")]
    pub drain_timeout_secs: u64,
}

impl Default for LanConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            local_devices: false,
            cache_path: None,
            drain_timeout_secs: default_drain_secs(),
        }
    }
}

impl LanConfig {
    /// Parse and validate the bind address.
    pub fn host_addr(&self) -> Result<IpAddr, ConfigError> {
        self.host.parse().map_err(|_| ConfigError::Validation {
            field: "lan.host".into(),
            reason: format!("not an IP address: {}", self.host),
        })
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }

    /// Cache file location: the configured override, or the platform
    /// data directory.
    pub fn cache_file(&self) -> PathBuf {
        self.cache_path.clone().unwrap_or_else(default_cache_path)
    }
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8889
}
fn default_drain_secs() -> u64 {
    10
}

fn default_cache_path() -> PathBuf {
    ProjectDirs::from("rs", "lanlink", "lanlink").map_or_else(
        || PathBuf::from(".lanlink-devices.json"),
        |dirs| dirs.data_dir().join("devices.json"),
    )
}

/// Stream-endpoint resolution settings.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct StreamConfig {
    /// Profile to select; the resolver falls back to the last available
    /// profile when this is out of range.
    #[serde(default)]
    pub profile_index: usize,

    /// Embed `username:password` into the resolved stream URI.
    #[serde(default)]
    pub embed_credentials: bool,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,
}

impl StreamConfig {
    /// Translate into the core resolver's settings.
    pub fn to_settings(&self) -> StreamSettings {
        StreamSettings {
            profile_index: self.profile_index,
            embed_credentials: self.embed_credentials,
            username: self.username.clone(),
            password: SecretString::from(self.password.clone()),
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("rs", "lanlink", "lanlink").map_or_else(
        || PathBuf::from("lanlink.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load configuration from an explicit file path + environment.
///
/// Environment variables use the `LANLINK_` prefix with `__` as the
/// section separator (e.g. `LANLINK_LAN__PORT=9000`).
pub fn load_config_from(path: &std::path::Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("LANLINK_").split("__"));

    let config: Config = figment.extract()?;
    validate(&config)?;
    Ok(config)
}

/// Load configuration from the canonical path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.lan.port == 0 {
        return Err(ConfigError::Validation {
            field: "lan.port".into(),
            reason: "port 0 would bind an ephemeral port devices cannot be told about".into(),
        });
    }
    config.lan.host_addr()?;
    Ok(())
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(&path, toml_str)?;
    Ok(())
}
