//! Device data history model (append-only persistence sink rows)

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use super::rules::SegmentId;
use super::telemetry::TelemetryRecord;

/// One classification as written to the `device_data` table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceDataRow {
    pub device_id: String,
    pub device_type: String,
    pub location: String,
    pub message_rate: f64,
    pub vlan: i64,
    pub recorded_at: DateTime<Utc>,
}

/// Stored row, including its database id
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StoredDeviceData {
    pub id: i64,
    pub device_id: String,
    pub device_type: String,
    pub location: String,
    pub message_rate: f64,
    pub vlan: i64,
    pub recorded_at: DateTime<Utc>,
}

impl DeviceDataRow {
    pub fn new(record: &TelemetryRecord, segment: SegmentId) -> Self {
        Self {
            device_id: record.device_id.clone(),
            device_type: record.text_or("type", "unknown"),
            location: record.text_or("location", "unknown"),
            message_rate: record.number_or("message_rate", 0.0),
            vlan: i64::from(segment),
            recorded_at: Utc::now(),
        }
    }

    pub async fn insert(&self, pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO device_data (device_id, device_type, location, message_rate, vlan, recorded_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(&self.device_id)
        .bind(&self.device_type)
        .bind(&self.location)
        .bind(self.message_rate)
        .bind(self.vlan)
        .bind(self.recorded_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Most recent rows first
    pub async fn recent(pool: &SqlitePool, limit: i64) -> Result<Vec<StoredDeviceData>, sqlx::Error> {
        sqlx::query_as::<_, StoredDeviceData>(
            "SELECT * FROM device_data ORDER BY id DESC LIMIT ?"
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    pub async fn list_by_device(
        pool: &SqlitePool,
        device_id: &str,
        limit: i64,
    ) -> Result<Vec<StoredDeviceData>, sqlx::Error> {
        sqlx::query_as::<_, StoredDeviceData>(
            "SELECT * FROM device_data WHERE device_id = ? ORDER BY id DESC LIMIT ?"
        )
        .bind(device_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_defaults() {
        let record = TelemetryRecord::new("cam-1").with_field("type", "camera");
        let row = DeviceDataRow::new(&record, 30);

        assert_eq!(row.device_id, "cam-1");
        assert_eq!(row.device_type, "camera");
        assert_eq!(row.location, "unknown");
        assert_eq!(row.message_rate, 0.0);
        assert_eq!(row.vlan, 30);
    }
}
