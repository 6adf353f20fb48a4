//! Device simulation handler

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::AppState;
use crate::logic::{self, IngestOutcome};

/// Run a telemetry message through the live ingestion path.
///
/// Dropped input is reported in the body, not as an HTTP error.
pub async fn simulate_device(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Json<Value> {
    match logic::simulate(&state.coordinator, body) {
        IngestOutcome::Accepted { device, assignment } => Json(json!({
            "status": "success",
            "device": device,
            "vlan": assignment,
        })),
        IngestOutcome::Dropped(reason) => Json(json!({
            "status": "dropped",
            "reason": reason.to_string(),
        })),
    }
}
