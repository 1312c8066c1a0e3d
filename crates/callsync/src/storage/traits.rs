//! Storage trait definitions

use crate::models::{BootRecord, DeviceConfig, SyncState};
use anyhow::Result;

/// Key-value style store for agent configuration and bookkeeping
///
/// Both the sync service and the host UI read and write through this trait.
/// Plain getters and setters move whole documents; changes that depend on the
/// stored sync state go through `update_sync_state` so they cannot clobber a
/// concurrent writer.
pub trait SyncStore: Send + Sync {
    /// Device registration, `None` until setup has been completed
    fn get_device_config(&self) -> Result<Option<DeviceConfig>>;

    /// Save device registration (upsert)
    fn save_device_config(&self, config: DeviceConfig) -> Result<()>;

    /// Sync bookkeeping, defaulted when nothing has been saved yet
    fn get_sync_state(&self) -> Result<SyncState>;

    /// Save sync bookkeeping (upsert)
    fn save_sync_state(&self, state: SyncState) -> Result<()>;

    /// Read, modify and write the sync state as one atomic step.
    /// Returns the state that was saved.
    fn update_sync_state(
        &self,
        update: &mut dyn FnMut(SyncState) -> SyncState,
    ) -> Result<SyncState>;

    /// Diagnostics from the last boot trigger run
    fn get_boot_record(&self) -> Result<Option<BootRecord>>;

    /// Save boot diagnostics (upsert)
    fn save_boot_record(&self, record: BootRecord) -> Result<()>;

    /// Reset sync bookkeeping so the next cycle starts from the first-run window.
    /// Device configuration is preserved.
    fn reset_sync_state(&self) -> Result<()> {
        self.update_sync_state(&mut |state| state.reset())?;
        Ok(())
    }
}
