// ── Push event receiver ──
//
// The cloud POSTs a JSON notification to the bridge whenever a device's
// remote state changes. The router resolves the payload's device id to
// the registered resources mirroring that device and triggers an
// unforced sync for each. The liveness probe on GET is a separate code
// path used by out-of-band connectivity checks — no resolution, no
// synchronization. Nothing here raises past the handler boundary.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::hub::Registry;
use crate::sync::Synchronizer;

/// Shared state for the webhook surface.
#[derive(Clone)]
pub struct PushState {
    pub registry: Arc<Registry>,
    pub sync: Arc<Synchronizer>,
}

/// Build the webhook router. `POST /` receives notifications, `GET /`
/// answers the connectivity probe. No other paths exist.
pub fn router(state: PushState) -> axum::Router {
    axum::Router::new()
        .route("/", get(liveness).post(receive_notification))
        .with_state(state)
}

async fn receive_notification(
    State(state): State<PushState>,
    body: String,
) -> impl IntoResponse {
    let payload: Value = match serde_json::from_str(&body) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "unparseable push notification body");
            return StatusCode::BAD_REQUEST;
        }
    };

    let Some(device_id) = payload.get("deviceId").and_then(Value::as_str) else {
        warn!("push notification missing deviceId field");
        return StatusCode::BAD_REQUEST;
    };

    debug!(device_id, event = ?payload.get("type"), "push notification received");

    let resources = state.registry.resources_for_device(device_id);
    if resources.is_empty() {
        // Unknown device: acknowledge and move on.
        debug!(device_id, "no registered resources for device");
        return StatusCode::NO_CONTENT;
    }

    for id in resources {
        let sync = Arc::clone(&state.sync);
        tokio::spawn(async move {
            if let Err(e) = sync.sync(&id, false, true).await {
                debug!(%id, error = %e, "push-triggered sync failed");
            }
        });
    }

    StatusCode::NO_CONTENT
}

/// Fixed success payload for connectivity verification.
async fn liveness() -> Json<Value> {
    Json(json!({ "success": "True" }))
}
