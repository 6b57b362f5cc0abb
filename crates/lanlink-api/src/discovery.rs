// ── Cloud discovery client ──
//
// Sign-in + device-list against the device cloud. This is the only cloud
// interaction the integration performs itself; everything after discovery
// happens over the LAN push protocol.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::ApiError;
use crate::transport::TransportConfig;

// ── Wire types ───────────────────────────────────────────────────────

/// Application identity the cloud expects alongside user credentials.
#[derive(Debug, Clone)]
pub struct AppCredentials {
    pub app_id: String,
    pub app_secret: SecretString,
}

impl AppCredentials {
    pub fn new(app_id: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            app_secret: SecretString::from(app_secret.into()),
        }
    }
}

/// One discovered device, as the cloud describes it.
///
/// Aliases accept the cloud's wire spellings (`product_name`,
/// `lanip_key`, `lanip_key_id`); serialization always writes the
/// canonical names, which is what the local cache stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecord {
    #[serde(alias = "product_name")]
    pub name: String,
    pub lan_ip: String,
    #[serde(alias = "lanip_key")]
    pub lan_ip_key: String,
    #[serde(alias = "lanip_key_id")]
    pub lan_ip_key_id: i64,
    pub mac: String,
}

#[derive(Serialize)]
struct SignInRequest<'a> {
    user: SignInUser<'a>,
}

#[derive(Serialize)]
struct SignInUser<'a> {
    email: &'a str,
    password: &'a str,
    application: SignInApplication<'a>,
}

#[derive(Serialize)]
struct SignInApplication<'a> {
    app_id: &'a str,
    app_secret: &'a str,
}

#[derive(Deserialize)]
struct SignInResponse {
    access_token: String,
}

/// The device list nests each record under a `device` key.
#[derive(Deserialize)]
struct DeviceEnvelope {
    device: DeviceRecord,
}

// ── Client ───────────────────────────────────────────────────────────

/// Raw HTTP client for the device cloud.
pub struct CloudClient {
    http: reqwest::Client,
    base_url: Url,
}

impl CloudClient {
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, ApiError> {
        Ok(Self {
            http: transport.build_client()?,
            base_url,
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Sign in and return the access token for subsequent calls.
    pub async fn sign_in(
        &self,
        app: &AppCredentials,
        username: &str,
        password: &SecretString,
    ) -> Result<String, ApiError> {
        let url = self.base_url.join("users/sign_in.json")?;
        let body = SignInRequest {
            user: SignInUser {
                email: username,
                password: password.expose_secret(),
                application: SignInApplication {
                    app_id: &app.app_id,
                    app_secret: app.app_secret.expose_secret(),
                },
            },
        };

        let response = self.http.post(url).json(&body).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ApiError::AuthFailed {
                message: response.text().await.unwrap_or_default(),
            });
        }
        if !status.is_success() {
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body = response.text().await?;
        let parsed: SignInResponse =
            serde_json::from_str(&body).map_err(|e| ApiError::Deserialization {
                message: e.to_string(),
                body,
            })?;

        debug!("cloud sign-in successful");
        Ok(parsed.access_token)
    }

    /// Fetch the account's device list.
    pub async fn list_devices(&self, access_token: &str) -> Result<Vec<DeviceRecord>, ApiError> {
        let url = self.base_url.join("apiv1/devices.json")?;
        let response = self
            .http
            .get(url)
            .header("Authorization", format!("auth_token {access_token}"))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body = response.text().await?;
        let envelopes: Vec<DeviceEnvelope> =
            serde_json::from_str(&body).map_err(|e| ApiError::Deserialization {
                message: e.to_string(),
                body,
            })?;

        Ok(envelopes.into_iter().map(|e| e.device).collect())
    }

    /// Invalidate the access token. Failures here are non-fatal for the
    /// caller; sign-out is best-effort cleanup on entry unload.
    pub async fn sign_out(&self, access_token: &str) -> Result<(), ApiError> {
        let url = self.base_url.join("users/sign_out.json")?;
        let response = self
            .http
            .post(url)
            .json(&serde_json::json!({ "user": { "access_token": access_token } }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

// ── Discovery entry point ────────────────────────────────────────────

/// Sign in and fetch the account's configured devices.
///
/// Fails with [`ApiError::AuthFailed`] on bad credentials and
/// [`ApiError::NoDevicesConfigured`] when the account has no devices --
/// callers distinguish the two when reporting back to the host.
pub async fn perform_discovery(
    client: &CloudClient,
    app: &AppCredentials,
    username: &str,
    password: &SecretString,
) -> Result<Vec<DeviceRecord>, ApiError> {
    let token = client.sign_in(app, username, password).await?;
    let devices = client.list_devices(&token).await?;

    if devices.is_empty() {
        return Err(ApiError::NoDevicesConfigured);
    }

    debug!(count = devices.len(), "cloud discovery complete");
    Ok(devices)
}
