//! FFI bindings for UniFFI export
//!
//! This module provides Kotlin bindings for the Android host app.
//!
//! ## Usage from Kotlin
//!
//! ```kotlin
//! // Route Rust logs to logcat first
//! initializeLogging(LogcatCallback(), FfiLogLevel.INFO)
//!
//! val service = CallSyncService("${filesDir}/callsync.db", "https://erp.example.com")
//!
//! // Setup screen
//! service.setDeviceConfig(FfiDeviceConfig(warehouseId, deviceId, mobileNumber, FfiSimPolicy.ALL, true))
//!
//! // Foreground service onCreate
//! service.start(ContentResolverSource(contentResolver), PowerWakeLock(powerManager), NotificationStatus(this))
//!
//! // ContentObserver.onChange
//! service.notifyCallLogChanged()
//!
//! // BOOT_COMPLETED / MY_PACKAGE_REPLACED receiver (off the main thread)
//! service.onBoot(FfiBootReason.BOOT_COMPLETED, ForegroundLauncher(context))
//! ```

mod logging;
mod service;
mod types;

pub use logging::{init_ffi_logger, set_log_callback, set_log_level};
pub use service::*;
pub use types::*;
