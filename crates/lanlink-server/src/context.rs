// ── Server context ──
//
// Everything the push handlers need, owned by the host integration layer
// and passed in at construction. Deliberately not a process-global: two
// config entries get two contexts, two registries, two dispatchers.

use std::sync::Arc;

use lanlink_core::{CommandSource, DeviceRegistry, KeyExchange, PropertyDispatcher};

/// Shared state behind the push server's routes. Cheap to clone.
#[derive(Clone)]
pub struct ServerContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    registry: Arc<DeviceRegistry>,
    dispatcher: Arc<PropertyDispatcher>,
    key_exchange: Arc<dyn KeyExchange>,
    commands: Arc<dyn CommandSource>,
}

impl ServerContext {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        dispatcher: Arc<PropertyDispatcher>,
        key_exchange: Arc<dyn KeyExchange>,
        commands: Arc<dyn CommandSource>,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                registry,
                dispatcher,
                key_exchange,
                commands,
            }),
        }
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.inner.registry
    }

    pub fn dispatcher(&self) -> &PropertyDispatcher {
        &self.inner.dispatcher
    }

    pub fn key_exchange(&self) -> &dyn KeyExchange {
        self.inner.key_exchange.as_ref()
    }

    pub fn commands(&self) -> &dyn CommandSource {
        self.inner.commands.as_ref()
    }
}
