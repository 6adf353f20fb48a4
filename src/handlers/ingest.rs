//! Raw telemetry bridge into the ingest queue

use axum::{extract::{State, Query}, body::Bytes, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{AppState, AppResult, AppError};

#[derive(Debug, Deserialize)]
pub struct IngestQuery {
    pub topic: Option<String>,
}

/// Queue a raw payload as if it arrived on `topic`
pub async fn enqueue(
    State(state): State<AppState>,
    Query(query): Query<IngestQuery>,
    body: Bytes,
) -> AppResult<(StatusCode, Json<Value>)> {
    let topic = query.topic
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::ValidationError("topic query parameter required".to_string()))?;

    if !state.ingest.submit(topic.clone(), body.to_vec()) {
        return Err(AppError::Unavailable("Ingest queue is not accepting messages".to_string()));
    }

    Ok((StatusCode::ACCEPTED, Json(json!({ "status": "queued", "topic": topic }))))
}
