// Server-layer errors. Discovery and core failures are wrapped at this
// boundary so the host only ever handles one error type per entry.

use std::net::SocketAddr;

use thiserror::Error;

use crate::session::SessionState;

/// Errors from session setup and bootstrap.
#[derive(Debug, Error)]
pub enum SessionError {
    /// `start()` called while a session is already live for this entry.
    #[error("Session already active (state: {state:?})")]
    AlreadyRunning { state: SessionState },

    /// The configured port could not be bound. Setup aborts cleanly:
    /// no socket is registered and the notifier task is never started.
    #[error("Failed to bind push server on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Cloud discovery (or the local cache fallback) failed.
    #[error(transparent)]
    Discovery(#[from] lanlink_api::ApiError),

    /// Domain-layer failure surfaced during setup.
    #[error(transparent)]
    Core(#[from] lanlink_core::CoreError),
}
