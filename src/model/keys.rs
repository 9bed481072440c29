//! Checkpoint and lock keys.
//!
//! Both sets are fixed: adding a pipeline means adding variants here.

use std::fmt;

use super::OrderFilter;

/// Keys of the checkpoint table.
///
/// The string forms are persisted and must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CheckpointKey {
    LastBackgroundStatsOrderUpdateTimestamp,
    LastBackgroundStatsProcessedOrderId,
    LastSalesStatsOrderUpdateTimestamp,
    LastSalesStatsProcessedOrderId,
}

impl CheckpointKey {
    pub const ALL: [CheckpointKey; 4] = [
        CheckpointKey::LastBackgroundStatsOrderUpdateTimestamp,
        CheckpointKey::LastBackgroundStatsProcessedOrderId,
        CheckpointKey::LastSalesStatsOrderUpdateTimestamp,
        CheckpointKey::LastSalesStatsProcessedOrderId,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckpointKey::LastBackgroundStatsOrderUpdateTimestamp => {
                "lastBackgroundStatsOrderUpdateTimestamp"
            }
            CheckpointKey::LastBackgroundStatsProcessedOrderId => {
                "lastBackgroundStatsProcessedOrderId"
            }
            CheckpointKey::LastSalesStatsOrderUpdateTimestamp => {
                "lastSalesStatsOrderUpdateTimestamp"
            }
            CheckpointKey::LastSalesStatsProcessedOrderId => "lastSalesStatsProcessedOrderId",
        }
    }
}

impl fmt::Display for CheckpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Advisory lock keys, one per pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockKey {
    BackgroundStats,
    SalesStats,
}

impl LockKey {
    /// Numeric id handed to the database lock primitive.
    pub fn id(&self) -> i64 {
        match self {
            LockKey::BackgroundStats => 1,
            LockKey::SalesStats => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LockKey::BackgroundStats => "backgroundStats",
            LockKey::SalesStats => "salesStats",
        }
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The statistics pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    BackgroundStats,
    SalesStats,
}

impl PipelineKind {
    pub fn name(&self) -> &'static str {
        self.lock_key().as_str()
    }

    pub fn lock_key(&self) -> LockKey {
        match self {
            PipelineKind::BackgroundStats => LockKey::BackgroundStats,
            PipelineKind::SalesStats => LockKey::SalesStats,
        }
    }

    /// Checkpoint holding the completion timestamp of the last processed order.
    pub fn timestamp_key(&self) -> CheckpointKey {
        match self {
            PipelineKind::BackgroundStats => CheckpointKey::LastBackgroundStatsOrderUpdateTimestamp,
            PipelineKind::SalesStats => CheckpointKey::LastSalesStatsOrderUpdateTimestamp,
        }
    }

    /// Checkpoint holding the id of the last processed order.
    pub fn order_id_key(&self) -> CheckpointKey {
        match self {
            PipelineKind::BackgroundStats => CheckpointKey::LastBackgroundStatsProcessedOrderId,
            PipelineKind::SalesStats => CheckpointKey::LastSalesStatsProcessedOrderId,
        }
    }

    /// Background usage counts abandoned orders too; sales only paid ones.
    pub fn order_filter(&self) -> OrderFilter {
        match self {
            PipelineKind::BackgroundStats => OrderFilter::Completed,
            PipelineKind::SalesStats => OrderFilter::Paid,
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
