//! CallSyncService facade for UniFFI export
//!
//! This provides a high-level, FFI-friendly API that wraps the store, the
//! sync service and the boot trigger. The host supplies the platform pieces
//! (call-log access, wake lock, notification) as callbacks.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, warn};

use crate::boot::BootTrigger;
use crate::error::SyncError;
use crate::ffi::logging::{init_ffi_logger, set_log_callback, set_log_level};
use crate::ffi::types::*;
use crate::models::{CallLogEntry, DeviceConfig};
use crate::provider::{CallLogProvider, ExportedCall};
use crate::settings::AgentSettings;
use crate::storage::{SqliteSyncStore, SyncStore};
use crate::sync::{StatusSink, SyncEngine, SyncService, SyncStatus, WakeLock};
use crate::upload::{HttpUploader, endpoint_url};

// ============================================================================
// Host Adapters
// ============================================================================

/// Call-log provider backed by the host's content resolver
struct HostCallLog {
    source: Box<dyn CallLogSource>,
}

impl CallLogProvider for HostCallLog {
    fn query_since(&self, since_millis: i64) -> Result<Vec<CallLogEntry>, SyncError> {
        if !self.source.has_permission() {
            return Err(SyncError::PermissionDenied);
        }
        Ok(self
            .source
            .query_since(since_millis)
            .into_iter()
            // The host query is advisory; enforce the floor here
            .filter(|row| row.date > since_millis)
            .map(ExportedCall::from)
            .filter_map(ExportedCall::into_entry)
            .collect())
    }
}

struct HostWakeLock {
    lock: Box<dyn WakeLockCallback>,
}

impl WakeLock for HostWakeLock {
    fn acquire(&self, tag: &str) {
        self.lock.acquire(tag.to_string());
    }

    fn release(&self, tag: &str) {
        self.lock.release(tag.to_string());
    }
}

struct HostStatus {
    callback: Box<dyn StatusCallback>,
}

impl StatusSink for HostStatus {
    fn update(&self, status: &SyncStatus) {
        debug!("status: {}", status);
        self.callback.on_status(status.to_string(), status.is_syncing());
    }
}

// ============================================================================
// Service Object
// ============================================================================

/// Main service object for the call-log sync agent
///
/// One instance lives in the host's foreground service. Setup screens may
/// create their own instance on the same database to read and write the
/// device configuration.
#[derive(uniffi::Object)]
pub struct CallSyncService {
    store: Arc<SqliteSyncStore>,
    settings: AgentSettings,
    running: Mutex<Option<Arc<SyncService>>>,
}

impl CallSyncService {
    fn open(db_path: String, settings: AgentSettings) -> Result<Arc<Self>, FfiError> {
        endpoint_url(&settings.api_base_url).map_err(|e| FfiError::InvalidArgument {
            message: format!("{:#}", e),
        })?;

        if let Some(parent) = PathBuf::from(&db_path).parent() {
            std::fs::create_dir_all(parent).map_err(|e| FfiError::Storage {
                message: format!("Failed to create database directory: {}", e),
            })?;
        }

        let store = SqliteSyncStore::new(&db_path).map_err(|e| FfiError::Storage {
            message: format!("Failed to open database: {:#}", e),
        })?;

        Ok(Arc::new(Self {
            store: Arc::new(store),
            settings,
            running: Mutex::new(None),
        }))
    }

    fn current(&self) -> Option<Arc<SyncService>> {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[uniffi::export]
impl CallSyncService {
    /// Open the agent database with default timers
    ///
    /// # Arguments
    /// * `db_path` - Path to the SQLite database file
    /// * `api_base_url` - Backend base URL; `api/lms/calls.php` is appended
    #[uniffi::constructor]
    pub fn new(db_path: String, api_base_url: String) -> Result<Arc<Self>, FfiError> {
        let settings = AgentSettings {
            api_base_url,
            ..AgentSettings::default()
        };
        Self::open(db_path, settings)
    }

    /// Open the agent database with settings given as `agent.json` content
    #[uniffi::constructor]
    pub fn with_settings_json(
        db_path: String,
        settings_json: String,
    ) -> Result<Arc<Self>, FfiError> {
        let settings: AgentSettings =
            serde_json::from_str(&settings_json).map_err(|e| FfiError::InvalidArgument {
                message: format!("Invalid settings: {}", e),
            })?;
        settings.validate().map_err(|e| FfiError::InvalidArgument {
            message: format!("Invalid settings: {:#}", e),
        })?;
        Self::open(db_path, settings)
    }

    // ========================================================================
    // Device Configuration
    // ========================================================================

    /// Save the device registration from the setup screen
    ///
    /// Rejects configurations missing a required identifier.
    pub fn set_device_config(&self, config: FfiDeviceConfig) -> Result<(), FfiError> {
        let config = DeviceConfig::from(config);
        config.validate()?;
        self.store.save_device_config(config)?;
        Ok(())
    }

    pub fn get_device_config(&self) -> Result<Option<FfiDeviceConfig>, FfiError> {
        Ok(self.store.get_device_config()?.map(FfiDeviceConfig::from))
    }

    // ========================================================================
    // Sync State
    // ========================================================================

    pub fn get_sync_state(&self) -> Result<FfiSyncState, FfiError> {
        Ok(self.store.get_sync_state()?.into())
    }

    /// Forget the watermark; the next cycle looks back from scratch
    pub fn reset_sync_state(&self) -> Result<(), FfiError> {
        self.store.reset_sync_state()?;
        Ok(())
    }

    pub fn get_last_boot(&self) -> Result<Option<FfiBootRecord>, FfiError> {
        Ok(self.store.get_boot_record()?.map(FfiBootRecord::from))
    }

    // ========================================================================
    // Service Lifecycle
    // ========================================================================

    /// Start the background sync worker
    ///
    /// Does nothing if the worker is already running.
    pub fn start(
        &self,
        source: Box<dyn CallLogSource>,
        wake_lock: Box<dyn WakeLockCallback>,
        status: Box<dyn StatusCallback>,
    ) -> Result<(), FfiError> {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if running.as_ref().is_some_and(|s| s.is_running()) {
            debug!("Sync service already running");
            return Ok(());
        }

        let uploader = HttpUploader::new(&self.settings.api_base_url, self.settings.http_timeout())
            .map_err(|e| FfiError::InvalidArgument {
                message: format!("{:#}", e),
            })?;
        let store: Arc<dyn SyncStore> = self.store.clone();
        let engine = SyncEngine::new(
            Arc::new(HostCallLog { source }),
            Arc::new(uploader),
            store,
            self.settings.sync_options(),
        );

        let service = SyncService::start(
            engine,
            Arc::new(HostWakeLock { lock: wake_lock }),
            Arc::new(HostStatus { callback: status }),
            self.settings.service_options(),
        )?;
        *running = Some(Arc::new(service));
        Ok(())
    }

    /// Stop the worker, waiting for an in-flight cycle to finish
    pub fn stop(&self) {
        let service = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(service) = service {
            service.stop();
        }
    }

    pub fn is_running(&self) -> bool {
        self.current().is_some_and(|s| s.is_running())
    }

    pub fn phase(&self) -> FfiSyncPhase {
        match self.current() {
            Some(service) if service.is_running() => service.phase().into(),
            _ => FfiSyncPhase::Stopped,
        }
    }

    /// Report a call-log change (content observer fired)
    pub fn notify_call_log_changed(&self) {
        match self.current() {
            Some(service) => service.notify_change(),
            None => debug!("Call log changed while service stopped"),
        }
    }

    /// Queue a sync on the worker without waiting
    pub fn request_sync(&self) -> Result<(), FfiError> {
        let service = self.current().ok_or(FfiError::ServiceNotRunning)?;
        service.request_sync();
        Ok(())
    }

    /// Run a sync on the calling thread (never call from the UI thread)
    pub fn sync_now(&self) -> Result<FfiSyncOutcome, FfiError> {
        let service = self.current().ok_or(FfiError::ServiceNotRunning)?;
        Ok(service.sync_now().into())
    }

    // ========================================================================
    // Boot
    // ========================================================================

    /// Handle a boot or package-replaced broadcast
    ///
    /// Blocks while retrying, so call it from a background thread
    /// (`goAsync()` in the receiver).
    pub fn on_boot(
        &self,
        reason: FfiBootReason,
        launcher: Box<dyn ServiceLauncherCallback>,
    ) -> Result<FfiBootOutcome, FfiError> {
        let store: Arc<dyn SyncStore> = self.store.clone();
        let trigger = BootTrigger::new(store, self.settings.boot_policy());
        let launch = || -> anyhow::Result<()> {
            if launcher.launch() {
                Ok(())
            } else {
                anyhow::bail!("Host refused to start the sync service")
            }
        };
        Ok(trigger.on_boot(reason.into(), &launch)?.into())
    }
}

// ============================================================================
// Free Functions
// ============================================================================

/// Route Rust logs to the host
///
/// Safe to call more than once; later calls replace the callback and level.
#[uniffi::export]
pub fn initialize_logging(callback: Box<dyn LogCallback>, max_level: FfiLogLevel) {
    let level = log::Level::from(max_level);
    if init_ffi_logger(level).is_err() {
        // Already installed
        set_log_level(level);
    }
    set_log_callback(Some(Arc::from(callback)));
}

/// Validate a backend base URL and return the full sync endpoint
#[uniffi::export]
pub fn sync_endpoint_url(api_base_url: String) -> Result<String, FfiError> {
    match endpoint_url(&api_base_url) {
        Ok(url) => Ok(url.to_string()),
        Err(e) => {
            warn!("Rejected API base URL {}: {:#}", api_base_url, e);
            Err(FfiError::InvalidArgument {
                message: format!("{:#}", e),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    struct FakeSource {
        granted: bool,
        rows: Vec<FfiCallLogRow>,
    }

    impl CallLogSource for FakeSource {
        fn has_permission(&self) -> bool {
            self.granted
        }

        fn query_since(&self, _since_millis: i64) -> Vec<FfiCallLogRow> {
            self.rows.clone()
        }
    }

    struct NoWakeLock;

    impl WakeLockCallback for NoWakeLock {
        fn acquire(&self, _tag: String) {}
        fn release(&self, _tag: String) {}
    }

    struct IgnoreStatus;

    impl StatusCallback for IgnoreStatus {
        fn on_status(&self, _text: String, _syncing: bool) {}
    }

    fn row(id: i64, date: i64) -> FfiCallLogRow {
        FfiCallLogRow {
            id,
            number: "+15550199".into(),
            name: None,
            call_type: 1,
            date,
            duration: 5,
            phone_account_id: None,
        }
    }

    fn device() -> FfiDeviceConfig {
        FfiDeviceConfig {
            warehouse_id: "WH-1".into(),
            device_id: "dev-1".into(),
            mobile_number: "+15550100".into(),
            sim_policy: FfiSimPolicy::All,
            auto_start: true,
        }
    }

    fn open_service(dir: &TempDir) -> Arc<CallSyncService> {
        let db = dir.path().join("nested").join("callsync.db");
        let settings = r#"{"api_base_url": "http://127.0.0.1:9", "sync_on_start": false}"#;
        CallSyncService::with_settings_json(db.to_string_lossy().into_owned(), settings.into())
            .unwrap()
    }

    #[test]
    fn test_host_call_log_enforces_floor_and_permission() {
        let provider = HostCallLog {
            source: Box::new(FakeSource {
                granted: true,
                rows: vec![row(1, 1_000), row(2, 2_000), row(3, 3_000)],
            }),
        };
        let entries = provider.query_since(2_000).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id.as_str(), "3");

        let denied = HostCallLog {
            source: Box::new(FakeSource {
                granted: false,
                rows: vec![row(1, 1_000)],
            }),
        };
        assert_eq!(denied.query_since(0), Err(SyncError::PermissionDenied));
    }

    #[test]
    fn test_device_config_round_trip() {
        let dir = TempDir::new().unwrap();
        let service = open_service(&dir);

        assert!(service.get_device_config().unwrap().is_none());
        service.set_device_config(device()).unwrap();

        let stored = service.get_device_config().unwrap().unwrap();
        assert_eq!(stored.device_id, "dev-1");
        assert_eq!(stored.sim_policy, FfiSimPolicy::All);
    }

    #[test]
    fn test_rejects_incomplete_device_config() {
        let dir = TempDir::new().unwrap();
        let service = open_service(&dir);

        let mut config = device();
        config.mobile_number = "  ".into();
        let err = service.set_device_config(config).unwrap_err();
        assert!(matches!(err, FfiError::ConfigMissing { field } if field == "mobile_number"));
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("callsync.db").to_string_lossy().into_owned();
        assert!(matches!(
            CallSyncService::new(db, "not a url".into()),
            Err(FfiError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_rejects_zero_sync_interval() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("callsync.db").to_string_lossy().into_owned();
        let settings = r#"{"sync_interval_secs": 0}"#;
        assert!(matches!(
            CallSyncService::with_settings_json(db, settings.into()),
            Err(FfiError::InvalidArgument { message }) if message.contains("sync_interval_secs")
        ));
    }

    #[test]
    fn test_sync_requires_running_service() {
        let dir = TempDir::new().unwrap();
        let service = open_service(&dir);

        assert_eq!(service.phase(), FfiSyncPhase::Stopped);
        assert!(matches!(service.sync_now(), Err(FfiError::ServiceNotRunning)));
        assert!(matches!(service.request_sync(), Err(FfiError::ServiceNotRunning)));
    }

    #[test]
    fn test_sync_without_permission_reports_failure() {
        let dir = TempDir::new().unwrap();
        let service = open_service(&dir);
        service.set_device_config(device()).unwrap();

        service
            .start(
                Box::new(FakeSource {
                    granted: false,
                    rows: Vec::new(),
                }),
                Box::new(NoWakeLock),
                Box::new(IgnoreStatus),
            )
            .unwrap();
        assert!(service.is_running());

        match service.sync_now().unwrap() {
            FfiSyncOutcome::Failed { retryable, .. } => assert!(!retryable),
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(service.phase(), FfiSyncPhase::Error);

        let state = service.get_sync_state().unwrap();
        assert_eq!(state.service_start_count, 1);
        assert!(state.last_error.is_some());

        service.stop();
        assert!(!service.is_running());
    }

    #[test]
    fn test_on_boot_reports_refused_launch() {
        struct Refuse(AtomicU32);
        impl ServiceLauncherCallback for Refuse {
            fn launch(&self) -> bool {
                self.0.fetch_add(1, Ordering::SeqCst);
                false
            }
        }

        let dir = TempDir::new().unwrap();
        let db = dir.path().join("callsync.db").to_string_lossy().into_owned();
        let settings = r#"{"api_base_url": "http://127.0.0.1:9", "boot_retry_delay_secs": 0}"#;
        let service = CallSyncService::with_settings_json(db, settings.into()).unwrap();
        service.set_device_config(device()).unwrap();

        let outcome = service
            .on_boot(FfiBootReason::BootCompleted, Box::new(Refuse(AtomicU32::new(0))))
            .unwrap();
        assert!(matches!(outcome, FfiBootOutcome::Failed { attempts: 3, .. }));

        let record = service.get_last_boot().unwrap().unwrap();
        assert_eq!(record.reason, FfiBootReason::BootCompleted);
        assert_eq!(record.attempts, 3);
    }
}
