//! Persisted sync bookkeeping

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Watermark and counters for the call-log sync
///
/// Persisted after every cycle. The watermark is the timestamp of the newest
/// call the upstream API has acknowledged; it never moves backwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    /// Newest acknowledged call timestamp (millis). 0 = never synced.
    pub last_synced_timestamp: i64,
    /// When the last successful cycle completed
    pub last_sync_at: Option<DateTime<Utc>>,
    /// Calls delivered upstream since install
    pub total_synced: u64,
    /// Calls delivered by the last successful cycle
    pub last_batch_count: u32,
    /// Times the sync service has been started
    pub service_start_count: u64,
    #[serde(default)]
    pub last_heartbeat_at: Option<DateTime<Utc>>,
    /// Reason the most recent cycle failed, cleared on success
    #[serde(default)]
    pub last_error: Option<String>,
    /// Bumped by every reset so a cycle that straddles one can tell
    #[serde(default)]
    pub reset_generation: u64,
}

impl SyncState {
    /// Whether a cycle has ever been acknowledged upstream
    pub fn has_watermark(&self) -> bool {
        self.last_synced_timestamp > 0
    }

    /// Record an acknowledged batch.
    ///
    /// The watermark only moves forward, so an older batch cannot rewind it.
    pub fn advanced(mut self, newest_timestamp: i64, count: usize) -> Self {
        self.last_synced_timestamp = self.last_synced_timestamp.max(newest_timestamp);
        self.total_synced = self.total_synced.saturating_add(count as u64);
        self.last_batch_count = u32::try_from(count).unwrap_or(u32::MAX);
        self.last_sync_at = Some(Utc::now());
        self.last_error = None;
        self
    }

    /// Record a cycle that found nothing to send
    pub fn idle_cycle(mut self) -> Self {
        self.last_batch_count = 0;
        self.last_sync_at = Some(Utc::now());
        self.last_error = None;
        self
    }

    /// Record a failed cycle. The watermark is left untouched.
    pub fn failed(mut self, reason: impl Into<String>) -> Self {
        self.last_error = Some(reason.into());
        self
    }

    /// Forget the watermark and counters. The start count survives.
    pub fn reset(self) -> Self {
        Self {
            service_start_count: self.service_start_count,
            reset_generation: self.reset_generation.wrapping_add(1),
            ..Default::default()
        }
    }

    pub fn service_started(mut self) -> Self {
        self.service_start_count += 1;
        self
    }

    pub fn heartbeat(mut self) -> Self {
        self.last_heartbeat_at = Some(Utc::now());
        self
    }
}

/// Why the boot trigger ran
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BootReason {
    /// Device finished booting
    BootCompleted,
    /// The host app was updated or reinstalled
    PackageReplaced,
    /// Started by hand (setup screen, CLI)
    Manual,
}

/// Result of a boot/restart attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BootOutcome {
    /// Service launched on the given attempt (1-based)
    Started { attempt: u32 },
    /// Device setup is incomplete
    SkippedConfigInvalid,
    /// The user turned auto-start off
    SkippedAutoStartDisabled,
    /// Every attempt failed
    Failed { attempts: u32, error: String },
}

impl BootOutcome {
    pub fn is_started(&self) -> bool {
        matches!(self, BootOutcome::Started { .. })
    }
}

/// Diagnostics for the last boot trigger run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootRecord {
    pub reason: BootReason,
    /// Launch attempts made during the last run
    pub attempts: u32,
    pub outcome: BootOutcome,
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_no_watermark() {
        let state = SyncState::default();
        assert!(!state.has_watermark());
        assert!(state.last_sync_at.is_none());
    }

    #[test]
    fn test_advanced_is_monotonic() {
        let state = SyncState::default().advanced(5_000, 3);
        assert_eq!(state.last_synced_timestamp, 5_000);
        assert_eq!(state.total_synced, 3);

        let state = state.advanced(1_000, 2);
        assert_eq!(state.last_synced_timestamp, 5_000);
        assert_eq!(state.total_synced, 5);
        assert_eq!(state.last_batch_count, 2);
    }

    #[test]
    fn test_failed_keeps_watermark() {
        let state = SyncState::default().advanced(9_000, 1).failed("HTTP 500");
        assert_eq!(state.last_synced_timestamp, 9_000);
        assert_eq!(state.last_error.as_deref(), Some("HTTP 500"));

        let state = state.advanced(10_000, 1);
        assert!(state.last_error.is_none());
    }

    #[test]
    fn test_reset_bumps_generation() {
        let state = SyncState::default().service_started().advanced(7_000, 2);
        let reset = state.clone().reset();
        assert_eq!(reset.last_synced_timestamp, 0);
        assert_eq!(reset.total_synced, 0);
        assert_eq!(reset.service_start_count, 1);
        assert_eq!(reset.reset_generation, state.reset_generation + 1);
    }

    #[test]
    fn test_older_documents_load() {
        let json = r#"{"last_synced_timestamp":5,"last_sync_at":null,"total_synced":1,
            "last_batch_count":1,"service_start_count":2}"#;
        let state: SyncState = serde_json::from_str(json).unwrap();
        assert_eq!(state.reset_generation, 0);
        assert_eq!(state.last_synced_timestamp, 5);
    }

    #[test]
    fn test_serialization() {
        let state = SyncState::default().advanced(42, 1).service_started();
        let json = serde_json::to_string(&state).unwrap();
        let restored: SyncState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, restored);
    }
}
