use thiserror::Error;

/// Top-level error type for the `lanlink-api` crate.
///
/// Covers the cloud discovery surface and the local cache. The server
/// layer maps these into its own diagnostics; consumers never unwrap raw
/// transport errors.
#[derive(Debug, Error)]
pub enum ApiError {
    // ── Authentication ──────────────────────────────────────────────
    /// Cloud sign-in rejected the credentials.
    #[error("Authentication failed: {message}")]
    AuthFailed { message: String },

    // ── Discovery ───────────────────────────────────────────────────
    /// The account exists but has no devices configured.
    #[error("No devices configured for this account")]
    NoDevicesConfigured,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Unexpected response from the cloud API.
    #[error("Cloud API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Cache ───────────────────────────────────────────────────────
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ApiError {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if re-entering credentials might resolve this.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthFailed { .. })
    }
}
