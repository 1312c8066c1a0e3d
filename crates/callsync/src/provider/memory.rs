//! In-memory call log, used by tests and by hosts that push rows in

use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use super::CallLogProvider;
use crate::error::SyncError;
use crate::models::CallLogEntry;

/// Call log held in memory
pub struct InMemoryCallLog {
    entries: RwLock<Vec<CallLogEntry>>,
    permission_granted: AtomicBool,
}

impl InMemoryCallLog {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            permission_granted: AtomicBool::new(true),
        }
    }

    pub fn with_entries(entries: Vec<CallLogEntry>) -> Self {
        let log = Self::new();
        log.extend(entries);
        log
    }

    /// Append a call, as the dialer would after hang-up
    pub fn push(&self, entry: CallLogEntry) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(entry);
    }

    pub fn extend(&self, entries: impl IntoIterator<Item = CallLogEntry>) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .extend(entries);
    }

    /// Simulate the user granting or revoking call-log access
    pub fn set_permission_granted(&self, granted: bool) {
        self.permission_granted.store(granted, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryCallLog {
    fn default() -> Self {
        Self::new()
    }
}

impl CallLogProvider for InMemoryCallLog {
    fn query_since(&self, since_millis: i64) -> Result<Vec<CallLogEntry>, SyncError> {
        if !self.permission_granted.load(Ordering::SeqCst) {
            return Err(SyncError::PermissionDenied);
        }
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries
            .iter()
            .filter(|e| e.timestamp_millis > since_millis)
            .cloned()
            .collect())
    }
}
