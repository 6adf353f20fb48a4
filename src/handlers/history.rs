//! Assignment history handlers

use axum::{extract::{State, Query}, Json};
use serde::Deserialize;

use crate::{AppState, AppResult, AppError};
use crate::models::{DeviceDataRow, StoredDeviceData};

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub device_id: Option<String>,
    pub limit: Option<i64>,
}

/// Recent classifications from the history sink
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<Vec<StoredDeviceData>>> {
    let pool = state.pool
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("Persistence is disabled".to_string()))?;

    let limit = query.limit.unwrap_or(50).clamp(1, 1000);
    let rows = match query.device_id {
        Some(device_id) => DeviceDataRow::list_by_device(pool, &device_id, limit).await?,
        None => DeviceDataRow::recent(pool, limit).await?,
    };

    Ok(Json(rows))
}
