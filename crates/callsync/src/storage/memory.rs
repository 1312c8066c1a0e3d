//! In-memory storage implementation, used for testing

use anyhow::Result;
use std::sync::RwLock;

use super::SyncStore;
use crate::models::{BootRecord, DeviceConfig, SyncState};

/// In-memory implementation of SyncStore
pub struct InMemorySyncStore {
    device_config: RwLock<Option<DeviceConfig>>,
    sync_state: RwLock<SyncState>,
    boot_record: RwLock<Option<BootRecord>>,
}

impl InMemorySyncStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self {
            device_config: RwLock::new(None),
            sync_state: RwLock::new(SyncState::default()),
            boot_record: RwLock::new(None),
        }
    }

    /// Create a store with device setup already completed
    pub fn with_device_config(config: DeviceConfig) -> Self {
        let store = Self::new();
        *store.device_config.write().unwrap() = Some(config);
        store
    }
}

impl Default for InMemorySyncStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncStore for InMemorySyncStore {
    fn get_device_config(&self) -> Result<Option<DeviceConfig>> {
        Ok(self.device_config.read().unwrap().clone())
    }

    fn save_device_config(&self, config: DeviceConfig) -> Result<()> {
        *self.device_config.write().unwrap() = Some(config);
        Ok(())
    }

    fn get_sync_state(&self) -> Result<SyncState> {
        Ok(self.sync_state.read().unwrap().clone())
    }

    fn save_sync_state(&self, state: SyncState) -> Result<()> {
        *self.sync_state.write().unwrap() = state;
        Ok(())
    }

    fn update_sync_state(
        &self,
        update: &mut dyn FnMut(SyncState) -> SyncState,
    ) -> Result<SyncState> {
        let mut guard = self.sync_state.write().unwrap();
        let next = update(guard.clone());
        *guard = next.clone();
        Ok(next)
    }

    fn get_boot_record(&self) -> Result<Option<BootRecord>> {
        Ok(self.boot_record.read().unwrap().clone())
    }

    fn save_boot_record(&self, record: BootRecord) -> Result<()> {
        *self.boot_record.write().unwrap() = Some(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_store() {
        let store = InMemorySyncStore::new();
        assert!(store.get_device_config().unwrap().is_none());
        assert_eq!(store.get_sync_state().unwrap(), SyncState::default());
        assert!(store.get_boot_record().unwrap().is_none());
    }

    #[test]
    fn test_reset_preserves_start_count_and_config() {
        let store =
            InMemorySyncStore::with_device_config(DeviceConfig::new("WH-1", "dev", "+1555"));
        let state = SyncState::default().service_started().advanced(1_000, 4);
        store.save_sync_state(state).unwrap();

        store.reset_sync_state().unwrap();

        let state = store.get_sync_state().unwrap();
        assert_eq!(state.last_synced_timestamp, 0);
        assert_eq!(state.total_synced, 0);
        assert_eq!(state.service_start_count, 1);
        assert!(store.get_device_config().unwrap().is_some());
    }

    #[test]
    fn test_update_sync_state_returns_saved() {
        let store = InMemorySyncStore::new();
        let saved = store
            .update_sync_state(&mut |state| state.advanced(2_000, 1))
            .unwrap();
        assert_eq!(saved.last_synced_timestamp, 2_000);
        assert_eq!(store.get_sync_state().unwrap(), saved);
    }
}
