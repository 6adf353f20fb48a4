//! Assignment history sink
//!
//! Fire-and-forget: `emit` never blocks and never fails the classification
//! that produced the row. Rows that cannot be queued or written are logged
//! and dropped.

use sqlx::SqlitePool;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::models::DeviceDataRow;

/// Receives one row per successful classification
pub trait AssignmentSink: Send + Sync {
    fn emit(&self, row: DeviceDataRow);
}

/// Persistence disabled
pub struct NullSink;

impl AssignmentSink for NullSink {
    fn emit(&self, _row: DeviceDataRow) {}
}

/// Bounded queue in front of [`run_sink_writer`]
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<DeviceDataRow>,
}

impl AssignmentSink for ChannelSink {
    fn emit(&self, row: DeviceDataRow) {
        match self.tx.try_send(row) {
            Ok(()) => {}
            Err(TrySendError::Full(row)) => {
                tracing::warn!("History queue full, dropping row for {}", row.device_id);
            }
            Err(TrySendError::Closed(row)) => {
                tracing::warn!("History writer stopped, dropping row for {}", row.device_id);
            }
        }
    }
}

pub fn sink_channel(capacity: usize) -> (ChannelSink, mpsc::Receiver<DeviceDataRow>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ChannelSink { tx }, rx)
}

/// Drain queued rows into the database until every sender is gone.
/// Returns the number of rows written.
pub async fn run_sink_writer(pool: SqlitePool, mut rx: mpsc::Receiver<DeviceDataRow>) -> u64 {
    let mut written = 0u64;

    while let Some(row) = rx.recv().await {
        match row.insert(&pool).await {
            Ok(()) => written += 1,
            Err(e) => tracing::error!("Failed to persist assignment for {}: {}", row.device_id, e),
        }
    }

    tracing::info!("History writer stopped. Rows written: {}", written);
    written
}
