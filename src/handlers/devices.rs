//! Device registry handlers

use std::collections::BTreeMap;

use axum::{extract::{State, Path}, Json};

use crate::{AppState, AppResult, AppError};
use crate::models::DeviceEntry;

/// List every registered device with its latest telemetry
pub async fn list(
    State(state): State<AppState>,
) -> Json<BTreeMap<String, DeviceEntry>> {
    Json(state.coordinator.list_devices())
}

/// Get single device
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DeviceEntry>> {
    let device = state.coordinator
        .get_device(&id)
        .ok_or_else(|| AppError::NotFound("Device not found".to_string()))?;

    Ok(Json(device))
}
