// lanlink-api: cloud-facing HTTP layer. Performs the one cloud interaction
// the integration needs -- device discovery -- and persists its result for
// local-device mode.

pub mod cache;
pub mod discovery;
pub mod error;
pub mod transport;

// ── Primary re-exports ──────────────────────────────────────────────
pub use cache::{CachedDiscovery, DiscoveryCache};
pub use discovery::{AppCredentials, CloudClient, DeviceRecord, perform_discovery};
pub use error::ApiError;
pub use transport::TransportConfig;
