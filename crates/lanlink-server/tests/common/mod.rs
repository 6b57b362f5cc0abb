#![allow(dead_code)]
// Shared fixtures for the server integration tests: scriptable
// collaborators and a context builder over a loopback device.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use lanlink_core::{
    CommandSource, CoreError, Device, DeviceRegistry, KeyExchange, LanCredentials, Notifier,
    PropertyDispatcher,
};
use lanlink_server::ServerContext;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

pub fn loopback_device(name: &str) -> Arc<Device> {
    Arc::new(Device::new(
        name,
        "127.0.0.1".parse().expect("loopback"),
        "aa:bb:cc:dd:ee:ff",
        LanCredentials::new("lan-key", 5),
    ))
}

// ── Key exchange / command collaborators ────────────────────────────

/// Returns a canned response so tests can assert verbatim passthrough.
pub struct CannedKeyExchange(pub Value);

#[async_trait]
impl KeyExchange for CannedKeyExchange {
    async fn exchange(&self, _device: &Device, _payload: Value) -> Result<Value, CoreError> {
        Ok(self.0.clone())
    }
}

pub struct CannedCommands(pub Value);

#[async_trait]
impl CommandSource for CannedCommands {
    async fn next_commands(&self, _device: &Device) -> Result<Value, CoreError> {
        Ok(self.0.clone())
    }
}

// ── Notifiers ───────────────────────────────────────────────────────

/// Long-running notifier that records lifecycle calls.
pub struct RecordingNotifier {
    cancel: CancellationToken,
    pub started: AtomicUsize,
    pub stopped: AtomicUsize,
    pub registered: std::sync::Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            cancel: CancellationToken::new(),
            started: AtomicUsize::new(0),
            stopped: AtomicUsize::new(0),
            registered: std::sync::Mutex::new(Vec::new()),
        })
    }

    pub fn start_count(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn start(&self) -> Result<(), CoreError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.cancel.cancelled().await;
        Ok(())
    }

    async fn stop(&self) {
        self.stopped.fetch_add(1, Ordering::SeqCst);
        self.cancel.cancel();
    }

    fn notify(&self) {}

    fn register_device(&self, device: Arc<Device>) {
        self.registered
            .lock()
            .expect("registered lock")
            .push(device.name().to_owned());
    }
}

/// Notifier whose background task fails immediately.
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn start(&self) -> Result<(), CoreError> {
        Err(CoreError::Collaborator {
            message: "cloud bridge unreachable".into(),
        })
    }

    async fn stop(&self) {}

    fn notify(&self) {}

    fn register_device(&self, _device: Arc<Device>) {}
}

// ── Context builder ─────────────────────────────────────────────────

pub struct Fixture {
    pub registry: Arc<DeviceRegistry>,
    pub dispatcher: Arc<PropertyDispatcher>,
    pub ctx: ServerContext,
}

pub fn context_with(devices: &[Arc<Device>]) -> Fixture {
    let registry = Arc::new(DeviceRegistry::new());
    for device in devices {
        registry.insert(Arc::clone(device));
    }
    let dispatcher = Arc::new(PropertyDispatcher::new());
    let ctx = ServerContext::new(
        Arc::clone(&registry),
        Arc::clone(&dispatcher),
        Arc::new(CannedKeyExchange(serde_json::json!({
            "key_exchange": { "random_2": "c3VydmV5", "time_2": 1_722_334_455 }
        }))),
        Arc::new(CannedCommands(serde_json::json!([]))),
    );
    Fixture {
        registry,
        dispatcher,
        ctx,
    }
}
