// ── Core error types ──
//
// User-facing errors from lanlink-core. Collaborator failures are wrapped
// here so consumers never handle transport-specific error types directly;
// the server layer translates these into HTTP responses at its boundary.

use thiserror::Error;

/// Single error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Data errors ──────────────────────────────────────────────────
    #[error("Device not found: {identifier}")]
    DeviceNotFound { identifier: String },

    #[error("Device already registered: {name}")]
    DeviceAlreadyRegistered { name: String },

    // ── Collaborator errors ──────────────────────────────────────────
    /// A collaborator call (profile query, key exchange, command source,
    /// notifier) failed. The stage that observed it decides whether this
    /// is retryable.
    #[error("Collaborator call failed: {message}")]
    Collaborator { message: String },

    /// A registered listener failed while handling a change notification.
    /// Always isolated by the dispatcher; surfaced only in logs.
    #[error("Listener failed for '{property}': {message}")]
    Listener { property: String, message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Wrap an arbitrary collaborator failure.
    pub fn collaborator(err: impl std::fmt::Display) -> Self {
        Self::Collaborator {
            message: err.to_string(),
        }
    }
}
