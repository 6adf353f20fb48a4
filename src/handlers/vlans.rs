//! VLAN assignment handlers

use std::collections::BTreeMap;

use axum::{extract::{State, Path}, Json};

use crate::{AppState, AppResult, AppError};
use crate::logic::CoordinatorStats;
use crate::models::{AssignmentRecord, AssignVlanRequest, AssignVlanResponse};

/// List every current assignment
pub async fn list(
    State(state): State<AppState>,
) -> Json<BTreeMap<String, AssignmentRecord>> {
    Json(state.coordinator.list_assignments())
}

/// Get single assignment
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<AssignmentRecord>> {
    let assignment = state.coordinator
        .get_assignment(&id)
        .ok_or_else(|| AppError::NotFound("Assignment not found".to_string()))?;

    Ok(Json(assignment))
}

/// Devices per VLAN and registry sizes
pub async fn stats(State(state): State<AppState>) -> Json<CoordinatorStats> {
    Json(state.coordinator.stats())
}

/// Legacy lookup used by older gateways
pub async fn assign_vlan(
    State(state): State<AppState>,
    Json(req): Json<AssignVlanRequest>,
) -> AppResult<Json<AssignVlanResponse>> {
    let device_id = req.device_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::ValidationError("device_id required".to_string()))?;

    let assignment = state.coordinator
        .get_assignment(&device_id)
        .ok_or_else(|| AppError::NotFound("Device not found yet via MQTT".to_string()))?;

    Ok(Json(AssignVlanResponse {
        device_id,
        vlan: assignment.segment,
    }))
}
