// ── Collaborator seams ──
//
// The core consumes these as trait objects; the host wires in the real
// implementations (cloud bridge, cryptographic session layer). Each call
// is a suspension point: implementations own their own timeouts, and any
// failure they return is treated as scoped to the calling stage.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::error::CoreError;
use crate::model::{Device, MediaProfile};

/// Profile/stream query collaborator for a stream-capable device.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Fetch the ordered list of profiles the device advertises.
    async fn fetch_profiles(&self) -> Result<Vec<MediaProfile>, CoreError>;

    /// Resolve the stream address for a selected profile token.
    async fn stream_uri(&self, profile_token: &str) -> Result<Url, CoreError>;
}

/// Session key-exchange collaborator.
///
/// The handshake content is opaque to the core: the push server hands the
/// inbound payload over and returns the response verbatim.
#[async_trait]
pub trait KeyExchange: Send + Sync {
    async fn exchange(&self, device: &Device, payload: Value) -> Result<Value, CoreError>;
}

/// Source of queued commands a device polls for.
#[async_trait]
pub trait CommandSource: Send + Sync {
    async fn next_commands(&self, device: &Device) -> Result<Value, CoreError>;
}

/// Background bridge carrying cloud-side push events toward the LAN.
///
/// Started alongside the push server and stopped with it, but supervised
/// independently: a notifier failure must never tear the server down, and
/// vice versa.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Run the outbound-notification channel until [`stop`](Self::stop)
    /// is called or the channel fails. This is the long-lived background
    /// task body; the session spawns it.
    async fn start(&self) -> Result<(), CoreError>;

    /// Stop the notification channel. Must be idempotent.
    async fn stop(&self);

    /// Wake the outbound channel (a device has something to report).
    fn notify(&self);

    /// Make the notifier aware of a device (called at ingestion time).
    fn register_device(&self, device: Arc<Device>);
}
