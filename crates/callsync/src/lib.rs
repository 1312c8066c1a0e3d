//! Callsync crate - call-log sync agent
//!
//! This crate provides platform-independent call-log sync functionality:
//! - Domain models (CallLogEntry, DeviceConfig, SyncState)
//! - Call-log provider and uploader trait abstractions
//! - Persistent sync cursor storage (in-memory, SQLite)
//! - Idempotent sync engine and background sync service
//! - Boot/restart trigger
//!
//! The Android host reaches it through the UniFFI bindings in [`ffi`].

uniffi::setup_scaffolding!();

pub mod boot;
pub mod error;
pub mod ffi;
pub mod models;
pub mod provider;
pub mod settings;
pub mod storage;
pub mod sync;
pub mod upload;

pub use boot::{BootPolicy, BootTrigger, ServiceLauncher};
pub use error::SyncError;
pub use models::{
    BootOutcome, BootReason, BootRecord, CallId, CallLogEntry, CallType, DeviceConfig, SimPolicy,
    SimSlot, SyncState,
};
pub use provider::{CallLogProvider, ExportedCall, InMemoryCallLog, JsonCallLogFile};
pub use settings::AgentSettings;
pub use storage::{InMemorySyncStore, SqliteSyncStore, SyncStore};
pub use sync::{
    // Engine
    SyncEngine, SyncOptions, SyncReport,
    // Service
    ServiceOptions, SyncOutcome, SyncPhase, SyncService, Trigger,
    // Host hooks
    LogStatusSink, NoopWakeLock, StatusSink, SyncStatus, WakeLock,
};
pub use upload::{CallRecord, CallUploader, HttpUploader, UploadPage};
