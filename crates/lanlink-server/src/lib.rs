// lanlink-server: the LAN-facing half of the integration. Hosts the push
// protocol the devices talk to and ties its lifecycle to the host's
// start/stop signals.

pub mod bootstrap;
pub mod context;
pub mod error;
pub mod push;
pub mod session;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bootstrap::{ingest_discovery, load_device_records};
pub use context::ServerContext;
pub use error::SessionError;
pub use session::{Session, SessionConfig, SessionState};
