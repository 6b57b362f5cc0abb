// ── Local push server routes ──
//
// The fixed route surface the LAN devices talk to. Every route is
// stateless beyond the shared context: key exchange and command polling
// delegate to their collaborators, property reports drive the dispatcher.
// None of the routes sits behind the platform's authentication layer --
// devices authenticate through the key-exchange session scheme instead.
//
// A malformed payload fails its own request with a 4xx and nothing else:
// handler errors never escape into the accept loop.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::{Json, Router};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use lanlink_core::{CoreError, Device};

use crate::context::ServerContext;

// ── Payload types ────────────────────────────────────────────────────

/// One reported property.
#[derive(Debug, Deserialize)]
pub struct DataPoint {
    pub name: String,
    pub value: Value,
    /// Sub-device address on the `node/` route variants.
    #[serde(default)]
    pub node: Option<String>,
}

/// `data` is a single point or a batch, depending on firmware.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum DataPoints {
    One(DataPoint),
    Many(Vec<DataPoint>),
}

impl DataPoints {
    fn into_vec(self) -> Vec<DataPoint> {
        match self {
            Self::One(point) => vec![point],
            Self::Many(points) => points,
        }
    }
}

/// Body of the datapoint / datapoint-ack routes.
#[derive(Debug, Deserialize)]
pub struct PropertyReport {
    #[serde(default)]
    pub seq_no: Option<u64>,
    pub data: DataPoints,
}

// ── Handler errors ───────────────────────────────────────────────────

enum PushError {
    /// The reporting address doesn't match any registered device.
    UnknownDevice(IpAddr),
    /// A collaborator rejected or failed the delegated call.
    Collaborator(CoreError),
}

impl IntoResponse for PushError {
    fn into_response(self) -> Response {
        match self {
            Self::UnknownDevice(addr) => (
                StatusCode::NOT_FOUND,
                format!("no registered device at {addr}"),
            )
                .into_response(),
            Self::Collaborator(e) => {
                warn!(error = %e, "push route collaborator call failed");
                (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
            }
        }
    }
}

// ── Router ───────────────────────────────────────────────────────────

/// Build the push-protocol router over a context.
///
/// Route registration is complete before the caller ever binds a socket;
/// the session manager relies on that ordering.
pub fn router(ctx: ServerContext) -> Router {
    Router::new()
        .route("/local_lan/key_exchange.json", post(key_exchange))
        .route("/local_lan/commands.json", get(commands))
        .route("/local_lan/property/datapoint.json", post(property_update))
        .route(
            "/local_lan/property/datapoint/ack.json",
            post(property_update),
        )
        .route(
            "/local_lan/node/property/datapoint.json",
            post(property_update),
        )
        .route(
            "/local_lan/node/property/datapoint/ack.json",
            post(property_update),
        )
        .with_state(ctx)
}

fn device_for(ctx: &ServerContext, addr: SocketAddr) -> Result<Arc<Device>, PushError> {
    ctx.registry()
        .get_by_addr(addr.ip())
        .ok_or(PushError::UnknownDevice(addr.ip()))
}

// ── Handlers ─────────────────────────────────────────────────────────

/// Key exchange: hand the payload to the session-crypto collaborator and
/// return its response verbatim. Unauthenticated by design -- this is the
/// step that establishes authentication.
async fn key_exchange(
    State(ctx): State<ServerContext>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, PushError> {
    let device = device_for(&ctx, addr)?;
    debug!(device = device.name(), "key exchange requested");

    let response = ctx
        .key_exchange()
        .exchange(&device, payload)
        .await
        .map_err(PushError::Collaborator)?;
    Ok(Json(response))
}

/// Command polling: the device asks whether anything is queued for it.
async fn commands(
    State(ctx): State<ServerContext>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Result<Json<Value>, PushError> {
    let device = device_for(&ctx, addr)?;

    let response = ctx
        .commands()
        .next_commands(&device)
        .await
        .map_err(PushError::Collaborator)?;
    Ok(Json(response))
}

/// Property report / acknowledgement: commit every reported point through
/// the dispatcher. Serves all four datapoint route variants -- the ack and
/// node paths carry the same payload shape.
async fn property_update(
    State(ctx): State<ServerContext>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(report): Json<PropertyReport>,
) -> Result<Json<Value>, PushError> {
    let device = device_for(&ctx, addr)?;

    for point in report.data.into_vec() {
        debug!(
            device = device.name(),
            property = %point.name,
            node = point.node.as_deref().unwrap_or(""),
            seq_no = report.seq_no.unwrap_or(0),
            "property report received"
        );
        ctx.dispatcher().notify(&device, &point.name, &point.value);
    }

    // A decoded report is proof of life.
    device.set_available(true);

    Ok(Json(Value::Object(serde_json::Map::new())))
}
