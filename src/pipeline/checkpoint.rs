//! Watermark persistence.
//!
//! A watermark is stored as two checkpoints: the completion timestamp as an
//! RFC 3339 string and the order id as a number.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::interfaces::{Result, StatsError, StatsStore, StatsTransaction};
use crate::model::{CheckpointKey, PipelineKind, Watermark};

/// Committed watermark of a pipeline, read outside any batch transaction.
pub async fn load_watermark(store: &dyn StatsStore, kind: PipelineKind) -> Result<Watermark> {
    let timestamp = store.read_checkpoint(kind.timestamp_key()).await?;
    let order_id = store.read_checkpoint(kind.order_id_key()).await?;
    decode_watermark(kind, timestamp, order_id)
}

/// Watermark as seen by a batch transaction.
pub async fn read_watermark(
    tx: &mut dyn StatsTransaction,
    kind: PipelineKind,
) -> Result<Watermark> {
    let timestamp = tx.get(kind.timestamp_key()).await?;
    let order_id = tx.get(kind.order_id_key()).await?;
    decode_watermark(kind, timestamp, order_id)
}

/// Persist both halves of the watermark on the batch transaction.
pub async fn write_watermark(
    tx: &mut dyn StatsTransaction,
    kind: PipelineKind,
    watermark: &Watermark,
) -> Result<()> {
    tx.set(kind.timestamp_key(), &json!(watermark.timestamp_text()))
        .await?;
    tx.set(kind.order_id_key(), &json!(watermark.order_id)).await?;
    Ok(())
}

/// Absent checkpoints decode to [`Watermark::origin`].
pub fn decode_watermark(
    kind: PipelineKind,
    timestamp: Option<Value>,
    order_id: Option<Value>,
) -> Result<Watermark> {
    let Some(timestamp) = timestamp else {
        return Ok(Watermark::origin());
    };
    let completed_at = decode_timestamp(kind.timestamp_key(), &timestamp)?;
    let order_id = match order_id {
        Some(value) => decode_order_id(kind.order_id_key(), &value)?,
        None => 0,
    };
    Ok(Watermark::new(completed_at, order_id))
}

fn decode_timestamp(key: CheckpointKey, value: &Value) -> Result<DateTime<Utc>> {
    let text = value.as_str().ok_or_else(|| StatsError::InvalidCheckpoint {
        key,
        reason: format!("expected a timestamp string, got {}", value),
    })?;
    DateTime::parse_from_rfc3339(text)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| StatsError::InvalidCheckpoint {
            key,
            reason: e.to_string(),
        })
}

fn decode_order_id(key: CheckpointKey, value: &Value) -> Result<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
    .ok_or_else(|| StatsError::InvalidCheckpoint {
        key,
        reason: format!("expected an order id, got {}", value),
    })
}
