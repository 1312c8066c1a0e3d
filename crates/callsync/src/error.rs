//! Failure taxonomy for a sync cycle

/// Why a sync cycle did not complete
///
/// No variant escapes the service: every failure is logged, recorded in the
/// sync state and retried on the next scheduled or triggered cycle (when
/// retryable at all).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// The call-log provider refused access
    #[error("Call log permission not granted")]
    PermissionDenied,

    /// Device setup is incomplete
    #[error("Missing configuration: {0}")]
    ConfigMissing(String),

    /// The request never got an HTTP response
    #[error("Network error: {0}")]
    Network(String),

    /// The upstream API answered with a non-success status
    #[error("Server error: HTTP {status}")]
    Server { status: u16 },

    /// Anything else (storage failures, panics inside a cycle)
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl SyncError {
    /// Whether the next cycle can be expected to succeed without user action
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::Network(_) | SyncError::Server { .. } | SyncError::Unexpected(_)
        )
    }
}

impl From<anyhow::Error> for SyncError {
    fn from(e: anyhow::Error) -> Self {
        SyncError::Unexpected(format!("{:#}", e))
    }
}
