//! Device registry entry and assignment record models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::rules::SegmentId;
use super::telemetry::TelemetryRecord;

/// Latest telemetry held for a device
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceEntry {
    #[serde(rename = "timestamp")]
    pub received_at: DateTime<Utc>,
    #[serde(rename = "data")]
    pub record: TelemetryRecord,
    pub topic: String,
}

/// Last computed segment for a device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub device_id: String,
    #[serde(rename = "vlan_id")]
    pub segment: SegmentId,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "reason")]
    pub rationale: String,
    /// Version of the rule set the segment was computed from
    pub rules_version: u64,
}

#[derive(Debug, Deserialize)]
pub struct AssignVlanRequest {
    pub device_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AssignVlanResponse {
    pub device_id: String,
    pub vlan: SegmentId,
}
