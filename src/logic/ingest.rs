//! Telemetry ingestion adapter
//!
//! The broker subscription itself lives outside this crate. A subscriber
//! hands `(topic, payload)` pairs to an [`IngestHandle`]; the worker drains
//! them into the coordinator. Simulation requests take the same parse path
//! synchronously.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::error::IngestError;
use crate::models::{FieldValue, TelemetryRecord};
use super::coordinator::{Coordinator, IngestOutcome};

// ============================================================================
// PAYLOAD PARSING
// ============================================================================

/// Decode a JSON object payload into a telemetry record.
///
/// `device_id` is lifted out of the object; every other top-level key
/// becomes a field. Non-zero numeric ids are accepted and kept as text.
pub fn parse_payload(payload: &[u8]) -> Result<TelemetryRecord, IngestError> {
    let value: Value = serde_json::from_slice(payload)
        .map_err(|e| IngestError::MalformedJson(e.to_string()))?;

    let Value::Object(mut object) = value else {
        return Err(IngestError::NotAnObject);
    };

    let device_id = match object.remove("device_id") {
        Some(Value::String(id)) => id,
        // Zero is not a usable id
        Some(Value::Number(n)) if n.as_f64() != Some(0.0) => n.to_string(),
        _ => return Err(IngestError::MissingDeviceId),
    };

    let fields = object
        .into_iter()
        .map(|(name, value)| (name, FieldValue::from(value)))
        .collect();

    Ok(TelemetryRecord { device_id, fields })
}

/// MQTT-style topic filter match (`+` one level, `#` all remaining levels)
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');

    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(f), Some(t)) if f == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

// ============================================================================
// QUEUE
// ============================================================================

#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Sending side of the ingest queue, cheap to clone
#[derive(Clone)]
pub struct IngestHandle {
    tx: mpsc::Sender<InboundMessage>,
}

impl IngestHandle {
    /// Queue a message without waiting. Returns `false` if it was dropped.
    pub fn submit(&self, topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> bool {
        let message = InboundMessage {
            topic: topic.into(),
            payload: payload.into(),
        };

        match self.tx.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(message)) => {
                tracing::warn!("Ingest queue full, dropping message on '{}'", message.topic);
                false
            }
            Err(TrySendError::Closed(message)) => {
                tracing::warn!("Ingest worker stopped, dropping message on '{}'", message.topic);
                false
            }
        }
    }
}

pub fn ingest_channel(capacity: usize) -> (IngestHandle, mpsc::Receiver<InboundMessage>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (IngestHandle { tx }, rx)
}

/// Feed queued messages to the coordinator until every handle is dropped.
/// Returns the number of accepted messages.
pub async fn run_ingest_worker(
    coordinator: Arc<Coordinator>,
    mut rx: mpsc::Receiver<InboundMessage>,
    topic_filter: String,
) -> u64 {
    let mut accepted = 0u64;

    while let Some(message) = rx.recv().await {
        if !topic_matches(&topic_filter, &message.topic) {
            tracing::debug!("{}", IngestError::TopicFiltered(message.topic));
            continue;
        }

        if coordinator.ingest(&message.topic, &message.payload).is_accepted() {
            accepted += 1;
        }
    }

    tracing::info!("Ingest worker stopped. Messages accepted: {}", accepted);
    accepted
}

// ============================================================================
// SIMULATION
// ============================================================================

/// Process an administrative simulation request like a live message.
///
/// A missing `device_id` becomes `sim-<unix seconds>`; the topic is derived
/// from the `type` field.
pub fn simulate(coordinator: &Coordinator, body: Value) -> IngestOutcome {
    let Value::Object(mut object) = body else {
        tracing::warn!("Dropping simulation request: body is not a JSON object");
        return IngestOutcome::Dropped(IngestError::NotAnObject);
    };

    if matches!(object.get("device_id"), None | Some(Value::Null)) {
        object.insert(
            "device_id".to_string(),
            Value::String(format!("sim-{}", Utc::now().timestamp())),
        );
    }

    let topic = format!(
        "smartcity/{}",
        object.get("type").and_then(Value::as_str).unwrap_or("sensor")
    );

    match serde_json::to_vec(&Value::Object(object)) {
        Ok(payload) => coordinator.ingest(&topic, &payload),
        Err(e) => IngestOutcome::Dropped(IngestError::MalformedJson(e.to_string())),
    }
}
