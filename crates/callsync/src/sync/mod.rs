//! Sync engine and background service
//!
//! The engine runs one idempotent cycle; the service decides when cycles run
//! (periodic timer, debounced change notifications, on-demand requests) and
//! guarantees at most one runs at a time.

mod cache;
mod debounce;
mod engine;
mod gate;
mod service;
mod status;
pub mod timing;
mod wakelock;

pub use cache::{DEFAULT_CACHE_CAPACITY, ProcessedIdCache};
pub use debounce::{DEFAULT_DEBOUNCE, Debouncer};
pub use engine::{DEFAULT_RECORDS_PER_PAGE, SyncEngine, SyncOptions, SyncReport};
pub use gate::{SyncGate, SyncPermit};
pub use service::{
    MAX_TIMER_INTERVAL, MIN_TIMER_INTERVAL, ServiceOptions, SyncOutcome, SyncPhase, SyncService,
    Trigger,
};
pub use status::{LogStatusSink, StatusSink, SyncStatus};
pub use timing::{format_call_time, query_floor};
pub use wakelock::{NoopWakeLock, WakeLock, WakeLockGuard};
