//! User-visible sync status
//!
//! On Android the status ends up as the foreground-service notification
//! text; failures never surface as anything louder than this string.

use chrono::{DateTime, Local, Utc};
use log::info;
use std::fmt;

/// What the status line should currently say
#[derive(Debug, Clone, PartialEq)]
pub enum SyncStatus {
    /// Service running, no cycle yet
    Waiting,
    Syncing,
    Synced {
        count: usize,
        at: DateTime<Utc>,
        total: u64,
    },
    Failed {
        reason: String,
    },
    Stopped,
}

impl SyncStatus {
    pub fn is_syncing(&self) -> bool {
        matches!(self, SyncStatus::Syncing)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::Waiting => write!(f, "Monitoring call log"),
            SyncStatus::Syncing => write!(f, "Syncing calls..."),
            SyncStatus::Synced { count: 0, at, total } => write!(
                f,
                "Up to date at {} ({} synced)",
                at.with_timezone(&Local).format("%H:%M"),
                total
            ),
            SyncStatus::Synced { count, at, total } => write!(
                f,
                "Synced {} calls at {} ({} total)",
                count,
                at.with_timezone(&Local).format("%H:%M"),
                total
            ),
            SyncStatus::Failed { reason } => write!(f, "Sync failed: {}", reason),
            SyncStatus::Stopped => write!(f, "Sync stopped"),
        }
    }
}

/// Receives status changes (notification updater, UI, log)
pub trait StatusSink: Send + Sync {
    fn update(&self, status: &SyncStatus);
}

/// Status sink that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct LogStatusSink;

impl StatusSink for LogStatusSink {
    fn update(&self, status: &SyncStatus) {
        info!("status: {}", status);
    }
}
