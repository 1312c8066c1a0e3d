//! Call-log providers
//!
//! The sync engine reads calls through the [`CallLogProvider`] trait so the
//! platform content provider, an exported JSON file and test fixtures are
//! interchangeable.

mod json_file;
mod memory;

pub use json_file::{ExportedCall, JsonCallLogFile};
pub use memory::InMemoryCallLog;

use crate::error::SyncError;
use crate::models::CallLogEntry;

/// Read-only access to the device call log
pub trait CallLogProvider: Send + Sync {
    /// Return every call that started strictly after `since_millis`.
    ///
    /// Order is unspecified; the engine sorts. Implementations return
    /// [`SyncError::PermissionDenied`] when the platform refuses access.
    fn query_since(&self, since_millis: i64) -> Result<Vec<CallLogEntry>, SyncError>;
}
