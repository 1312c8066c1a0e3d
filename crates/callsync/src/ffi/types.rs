//! FFI-friendly type wrappers for UniFFI export
//!
//! These types convert internal Rust types to FFI-compatible versions:
//! - `DateTime<Utc>` → `i64` (Unix timestamp, seconds)
//! - `CallId` → `i64` (platform row id)
//! - Enums carrying reports or errors → flat records/strings

use crate::error::SyncError;
use crate::models::{
    BootOutcome, BootReason, BootRecord, DeviceConfig, SimPolicy, SyncState,
};
use crate::provider::ExportedCall;
use crate::sync::{SyncOutcome, SyncPhase, SyncReport};

// ============================================================================
// Error Types
// ============================================================================

/// FFI-friendly error type
#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum FfiError {
    #[error("Call log permission not granted")]
    PermissionDenied,

    #[error("Missing configuration: {field}")]
    ConfigMissing { field: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Server error: HTTP {status}")]
    Server { status: u16 },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Sync service is not running")]
    ServiceNotRunning,

    #[error("Unexpected error: {message}")]
    Unexpected { message: String },
}

impl From<SyncError> for FfiError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::PermissionDenied => FfiError::PermissionDenied,
            SyncError::ConfigMissing(field) => FfiError::ConfigMissing { field },
            SyncError::Network(message) => FfiError::Network { message },
            SyncError::Server { status } => FfiError::Server { status },
            SyncError::Unexpected(message) => FfiError::Unexpected { message },
        }
    }
}

impl From<anyhow::Error> for FfiError {
    fn from(e: anyhow::Error) -> Self {
        match e.downcast::<SyncError>() {
            Ok(sync) => sync.into(),
            // Everything else that reaches the facade comes out of the store
            Err(e) => FfiError::Storage {
                message: format!("{:#}", e),
            },
        }
    }
}

// ============================================================================
// Call Log Rows
// ============================================================================

/// One call-log row as read by the host from `CallLog.Calls`
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCallLogRow {
    /// `_ID` column
    pub id: i64,
    pub number: String,
    /// `CACHED_NAME`, if the contact is known
    pub name: Option<String>,
    /// `TYPE` column (1 = incoming, 2 = outgoing, 3 = missed, ...)
    pub call_type: i32,
    /// `DATE` column, millis since epoch
    pub date: i64,
    /// `DURATION` column, seconds
    pub duration: i64,
    /// `PHONE_ACCOUNT_ID` column
    pub phone_account_id: Option<String>,
}

impl From<FfiCallLogRow> for ExportedCall {
    fn from(row: FfiCallLogRow) -> Self {
        Self {
            id: row.id,
            number: row.number,
            name: row.name,
            type_code: row.call_type,
            date: row.date,
            duration: row.duration,
            phone_account_id: row.phone_account_id,
        }
    }
}

// ============================================================================
// Device Configuration
// ============================================================================

/// Which SIM's calls are forwarded
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiSimPolicy {
    All,
    Sim1,
    Sim2,
}

impl From<SimPolicy> for FfiSimPolicy {
    fn from(p: SimPolicy) -> Self {
        match p {
            SimPolicy::All => FfiSimPolicy::All,
            SimPolicy::Sim1 => FfiSimPolicy::Sim1,
            SimPolicy::Sim2 => FfiSimPolicy::Sim2,
        }
    }
}

impl From<FfiSimPolicy> for SimPolicy {
    fn from(p: FfiSimPolicy) -> Self {
        match p {
            FfiSimPolicy::All => SimPolicy::All,
            FfiSimPolicy::Sim1 => SimPolicy::Sim1,
            FfiSimPolicy::Sim2 => SimPolicy::Sim2,
        }
    }
}

/// FFI-friendly device registration
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDeviceConfig {
    pub warehouse_id: String,
    pub device_id: String,
    pub mobile_number: String,
    pub sim_policy: FfiSimPolicy,
    pub auto_start: bool,
}

impl From<DeviceConfig> for FfiDeviceConfig {
    fn from(c: DeviceConfig) -> Self {
        Self {
            warehouse_id: c.warehouse_id,
            device_id: c.device_id,
            mobile_number: c.mobile_number,
            sim_policy: c.sim_policy.into(),
            auto_start: c.auto_start,
        }
    }
}

impl From<FfiDeviceConfig> for DeviceConfig {
    fn from(c: FfiDeviceConfig) -> Self {
        DeviceConfig::new(c.warehouse_id, c.device_id, c.mobile_number)
            .with_sim_policy(c.sim_policy.into())
            .with_auto_start(c.auto_start)
    }
}

// ============================================================================
// Sync Types
// ============================================================================

/// FFI-friendly sync state
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSyncState {
    /// Watermark, millis since epoch (0 = never synced)
    pub last_synced_timestamp: i64,
    /// Unix timestamp (seconds since epoch)
    pub last_sync_at: Option<i64>,
    pub total_synced: u64,
    pub last_batch_count: u32,
    pub service_start_count: u64,
    /// Unix timestamp (seconds since epoch)
    pub last_heartbeat_at: Option<i64>,
    pub last_error: Option<String>,
}

impl From<SyncState> for FfiSyncState {
    fn from(s: SyncState) -> Self {
        Self {
            last_synced_timestamp: s.last_synced_timestamp,
            last_sync_at: s.last_sync_at.map(|t| t.timestamp()),
            total_synced: s.total_synced,
            last_batch_count: s.last_batch_count,
            service_start_count: s.service_start_count,
            last_heartbeat_at: s.last_heartbeat_at.map(|t| t.timestamp()),
            last_error: s.last_error,
        }
    }
}

/// FFI-friendly cycle statistics
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSyncReport {
    pub queried: u32,
    pub filtered_by_sim: u32,
    pub skipped_duplicates: u32,
    pub uploaded: u32,
    pub pages: u32,
    pub watermark: i64,
    pub total_synced: u64,
    pub duration_ms: u64,
}

/// Counters wider than `u32` saturate rather than wrap
fn count_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

impl From<SyncReport> for FfiSyncReport {
    fn from(r: SyncReport) -> Self {
        Self {
            queried: count_u32(r.queried),
            filtered_by_sim: count_u32(r.filtered_by_sim),
            skipped_duplicates: count_u32(r.skipped_duplicates),
            uploaded: count_u32(r.uploaded),
            pages: r.pages,
            watermark: r.watermark,
            total_synced: r.total_synced,
            duration_ms: r.duration_ms,
        }
    }
}

/// Result of an on-demand sync
#[derive(Debug, Clone, uniffi::Enum)]
pub enum FfiSyncOutcome {
    Completed { report: FfiSyncReport },
    Failed { error: String, retryable: bool },
    /// A cycle was already running
    Skipped,
}

impl From<SyncOutcome> for FfiSyncOutcome {
    fn from(o: SyncOutcome) -> Self {
        match o {
            SyncOutcome::Completed(report) => FfiSyncOutcome::Completed {
                report: report.into(),
            },
            SyncOutcome::Failed(e) => FfiSyncOutcome::Failed {
                retryable: e.is_retryable(),
                error: e.to_string(),
            },
            SyncOutcome::Skipped => FfiSyncOutcome::Skipped,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiSyncPhase {
    Stopped,
    Idle,
    Syncing,
    Error,
}

impl From<SyncPhase> for FfiSyncPhase {
    fn from(p: SyncPhase) -> Self {
        match p {
            SyncPhase::Idle => FfiSyncPhase::Idle,
            SyncPhase::Syncing => FfiSyncPhase::Syncing,
            SyncPhase::Error => FfiSyncPhase::Error,
        }
    }
}

// ============================================================================
// Boot Types
// ============================================================================

/// Broadcast that woke the boot receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiBootReason {
    BootCompleted,
    PackageReplaced,
    Manual,
}

impl From<FfiBootReason> for BootReason {
    fn from(r: FfiBootReason) -> Self {
        match r {
            FfiBootReason::BootCompleted => BootReason::BootCompleted,
            FfiBootReason::PackageReplaced => BootReason::PackageReplaced,
            FfiBootReason::Manual => BootReason::Manual,
        }
    }
}

impl From<BootReason> for FfiBootReason {
    fn from(r: BootReason) -> Self {
        match r {
            BootReason::BootCompleted => FfiBootReason::BootCompleted,
            BootReason::PackageReplaced => FfiBootReason::PackageReplaced,
            BootReason::Manual => FfiBootReason::Manual,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum FfiBootOutcome {
    Started { attempt: u32 },
    SkippedConfigInvalid,
    SkippedAutoStartDisabled,
    Failed { attempts: u32, error: String },
}

impl From<BootOutcome> for FfiBootOutcome {
    fn from(o: BootOutcome) -> Self {
        match o {
            BootOutcome::Started { attempt } => FfiBootOutcome::Started { attempt },
            BootOutcome::SkippedConfigInvalid => FfiBootOutcome::SkippedConfigInvalid,
            BootOutcome::SkippedAutoStartDisabled => FfiBootOutcome::SkippedAutoStartDisabled,
            BootOutcome::Failed { attempts, error } => FfiBootOutcome::Failed { attempts, error },
        }
    }
}

/// Diagnostics for the last boot trigger run
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiBootRecord {
    pub reason: FfiBootReason,
    pub attempts: u32,
    pub outcome: FfiBootOutcome,
    /// Unix timestamp (seconds since epoch)
    pub at: i64,
}

impl From<BootRecord> for FfiBootRecord {
    fn from(r: BootRecord) -> Self {
        Self {
            reason: r.reason.into(),
            attempts: r.attempts,
            outcome: r.outcome.into(),
            at: r.at.timestamp(),
        }
    }
}

// ============================================================================
// Callback Traits
// ============================================================================

/// Host access to the platform call log
#[uniffi::export(callback_interface)]
pub trait CallLogSource: Send + Sync {
    /// Whether READ_CALL_LOG is currently granted
    fn has_permission(&self) -> bool;
    /// Rows whose `DATE` is after `since_millis`
    fn query_since(&self, since_millis: i64) -> Vec<FfiCallLogRow>;
}

/// Host partial wake lock (`PowerManager.WakeLock`)
#[uniffi::export(callback_interface)]
pub trait WakeLockCallback: Send + Sync {
    fn acquire(&self, tag: String);
    fn release(&self, tag: String);
}

/// Receives status text for the foreground-service notification
#[uniffi::export(callback_interface)]
pub trait StatusCallback: Send + Sync {
    fn on_status(&self, text: String, syncing: bool);
}

/// Starts the host's foreground service
#[uniffi::export(callback_interface)]
pub trait ServiceLauncherCallback: Send + Sync {
    /// Returns false if the platform refused the start
    fn launch(&self) -> bool;
}

// ============================================================================
// Log Callback
// ============================================================================

/// Log level for FFI callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<log::Level> for FfiLogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => FfiLogLevel::Error,
            log::Level::Warn => FfiLogLevel::Warn,
            log::Level::Info => FfiLogLevel::Info,
            log::Level::Debug => FfiLogLevel::Debug,
            log::Level::Trace => FfiLogLevel::Trace,
        }
    }
}

impl From<FfiLogLevel> for log::Level {
    fn from(level: FfiLogLevel) -> Self {
        match level {
            FfiLogLevel::Error => log::Level::Error,
            FfiLogLevel::Warn => log::Level::Warn,
            FfiLogLevel::Info => log::Level::Info,
            FfiLogLevel::Debug => log::Level::Debug,
            FfiLogLevel::Trace => log::Level::Trace,
        }
    }
}

/// Callback interface for receiving log messages from Rust
///
/// Kotlin should forward these to `android.util.Log`.
#[uniffi::export(callback_interface)]
pub trait LogCallback: Send + Sync {
    /// `target` is the module path, e.g. "callsync::sync::engine"
    fn on_log(&self, level: FfiLogLevel, target: String, message: String);
}
