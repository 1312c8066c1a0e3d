//! Persisted agent state
//!
//! Device configuration and sync bookkeeping are shared with the host app's
//! UI, so they sit behind the [`SyncStore`] trait with in-memory and SQLite
//! implementations.

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemorySyncStore;
pub use sqlite::SqliteSyncStore;
pub use traits::SyncStore;
