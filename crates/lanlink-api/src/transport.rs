// Shared transport configuration for building reqwest::Client instances.
//
// The discovery client is the only HTTP consumer today, but timeout and
// TLS knobs live here so they stay in one place.

use std::time::Duration;

use crate::error::ApiError;

/// Transport configuration for the cloud client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    /// Accept invalid TLS certificates. Off by default; some regional
    /// cloud endpoints ship certificates that fail system validation,
    /// so the host may opt in.
    pub danger_accept_invalid_certs: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            danger_accept_invalid_certs: false,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, ApiError> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("lanlink/", env!("CARGO_PKG_VERSION")));

        if self.danger_accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(builder.build()?)
    }
}
