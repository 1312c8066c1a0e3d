//! `log` backend that forwards records to the host over a callback
//!
//! On Android the callback writes to logcat, so agent logs show up next to
//! the host app's own.

use std::sync::{Arc, OnceLock, RwLock};

use log::{Level, Log, Metadata, Record, SetLoggerError};

use super::types::{FfiLogLevel, LogCallback};

static HOST_LOGGER: OnceLock<HostLogger> = OnceLock::new();

struct HostLogger {
    sink: RwLock<Option<Arc<dyn LogCallback>>>,
}

impl HostLogger {
    fn sink(&self) -> Option<Arc<dyn LogCallback>> {
        self.sink.read().ok().and_then(|guard| guard.clone())
    }
}

impl Log for HostLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        // Clone out of the lock so a callback that logs cannot deadlock us
        let Some(sink) = self.sink() else {
            return;
        };
        sink.on_log(
            FfiLogLevel::from(record.level()),
            record.target().to_string(),
            record.args().to_string(),
        );
    }

    fn flush(&self) {}
}

/// Install the host logger as the global `log` backend.
///
/// Fails if another logger (e.g. env_logger in the daemon) is already set.
/// Records are dropped until a callback is registered.
pub fn init_ffi_logger(max_level: Level) -> Result<(), SetLoggerError> {
    let logger = HOST_LOGGER.get_or_init(|| HostLogger {
        sink: RwLock::new(None),
    });
    log::set_logger(logger)?;
    log::set_max_level(max_level.to_level_filter());
    Ok(())
}

/// Replace the callback receiving log records; `None` silences output
pub fn set_log_callback(callback: Option<Arc<dyn LogCallback>>) {
    if let Some(logger) = HOST_LOGGER.get() {
        if let Ok(mut guard) = logger.sink.write() {
            *guard = callback;
        }
    }
}

/// Change the maximum level passed to the callback
pub fn set_log_level(level: Level) {
    log::set_max_level(level.to_level_filter());
}
