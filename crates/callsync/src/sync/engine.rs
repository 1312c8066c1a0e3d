//! One sync cycle: cursor → query → filter → dedup → upload → advance

use anyhow::Result;
use chrono::{Local, Utc};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Instant;

use super::cache::{DEFAULT_CACHE_CAPACITY, ProcessedIdCache};
use super::timing::query_floor;
use crate::error::SyncError;
use crate::models::{CallId, CallLogEntry, DeviceConfig};
use crate::provider::CallLogProvider;
use crate::storage::SyncStore;
use crate::upload::{CallRecord, CallUploader, paginate};

/// Default number of calls per form post
pub const DEFAULT_RECORDS_PER_PAGE: usize = 100;

/// Tuning for the sync engine
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// How far back a device that has never synced looks
    pub first_run_lookback: chrono::Duration,
    /// Maximum calls per form post
    pub records_per_page: usize,
    /// Size of the in-session duplicate cache
    pub cache_capacity: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            first_run_lookback: chrono::Duration::hours(24),
            records_per_page: DEFAULT_RECORDS_PER_PAGE,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// Statistics from one sync cycle
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SyncReport {
    /// Calls returned by the provider
    pub queried: usize,
    /// Calls excluded by the SIM policy
    pub filtered_by_sim: usize,
    /// Calls already acknowledged earlier in this session
    pub skipped_duplicates: usize,
    /// Calls delivered upstream
    pub uploaded: usize,
    /// Form posts made
    pub pages: u32,
    /// Watermark after the cycle
    pub watermark: i64,
    /// Calls delivered since install
    pub total_synced: u64,
    pub duration_ms: u64,
}

/// Owns everything a cycle mutates: the cursor (through the store) and the
/// duplicate cache. Callers serialize access; see `SyncService`.
pub struct SyncEngine {
    provider: Arc<dyn CallLogProvider>,
    uploader: Arc<dyn CallUploader>,
    store: Arc<dyn SyncStore>,
    cache: ProcessedIdCache,
    options: SyncOptions,
}

impl SyncEngine {
    pub fn new(
        provider: Arc<dyn CallLogProvider>,
        uploader: Arc<dyn CallUploader>,
        store: Arc<dyn SyncStore>,
        options: SyncOptions,
    ) -> Self {
        Self {
            provider,
            uploader,
            store,
            cache: ProcessedIdCache::new(options.cache_capacity),
            options,
        }
    }

    pub fn store(&self) -> &Arc<dyn SyncStore> {
        &self.store
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Ids acknowledged earlier in this session
    pub fn cache(&self) -> &ProcessedIdCache {
        &self.cache
    }

    /// Run one cycle.
    ///
    /// On failure the watermark is left where it was and the reason is
    /// recorded in the sync state; the same calls are eligible again on the
    /// next cycle.
    pub fn run_cycle(&mut self) -> Result<SyncReport, SyncError> {
        let start = Instant::now();
        match self.try_cycle() {
            Ok(mut report) => {
                report.duration_ms = start.elapsed().as_millis() as u64;
                if report.uploaded > 0 {
                    info!(
                        "Synced {} calls in {} page(s), watermark {} ({}ms)",
                        report.uploaded, report.pages, report.watermark, report.duration_ms
                    );
                } else {
                    debug!(
                        "Nothing to sync ({} queried, {} filtered, {} duplicates)",
                        report.queried, report.filtered_by_sim, report.skipped_duplicates
                    );
                }
                Ok(report)
            }
            Err(e) => {
                self.record_failure(&e);
                Err(e)
            }
        }
    }

    /// Log a failed cycle and store its reason, leaving the watermark alone
    pub fn record_failure(&self, error: &SyncError) {
        match error {
            SyncError::PermissionDenied => warn!("Skipping sync: {}", error),
            SyncError::ConfigMissing(_) => warn!("Skipping sync until setup completes: {}", error),
            _ => warn!("Sync failed, will retry next cycle: {}", error),
        }

        let reason = error.to_string();
        let saved = self
            .store
            .update_sync_state(&mut |state| state.failed(reason.clone()));
        if let Err(e) = saved {
            warn!("Failed to record sync failure: {:#}", e);
        }
    }

    /// Count a service start
    pub fn record_service_start(&self) -> Result<()> {
        self.store
            .update_sync_state(&mut |state| state.service_started())?;
        Ok(())
    }

    /// Stamp the heartbeat time
    pub fn record_heartbeat(&self) -> Result<()> {
        self.store.update_sync_state(&mut |state| state.heartbeat())?;
        Ok(())
    }

    fn load_config(&self) -> Result<DeviceConfig, SyncError> {
        let config = self
            .store
            .get_device_config()?
            .ok_or_else(|| SyncError::ConfigMissing("device_config".to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn try_cycle(&mut self) -> Result<SyncReport, SyncError> {
        let config = self.load_config()?;
        let state = self.store.get_sync_state()?;

        let since = query_floor(
            state.last_synced_timestamp,
            Utc::now(),
            self.options.first_run_lookback,
        );
        let mut entries = self.provider.query_since(since)?;
        entries.sort_by_key(|e| e.timestamp_millis);

        let mut report = SyncReport {
            queried: entries.len(),
            watermark: state.last_synced_timestamp,
            total_synced: state.total_synced,
            ..Default::default()
        };

        let mut batch: Vec<CallLogEntry> = Vec::with_capacity(entries.len());
        for entry in entries {
            if !config.sim_policy.allows(entry.sim_slot) {
                report.filtered_by_sim += 1;
            } else if self.cache.contains(&entry.id) {
                report.skipped_duplicates += 1;
            } else {
                batch.push(entry);
            }
        }

        if batch.is_empty() {
            self.store.update_sync_state(&mut |current| current.idle_cycle())?;
            return Ok(report);
        }

        let newest = batch
            .iter()
            .map(|e| e.timestamp_millis)
            .max()
            .unwrap_or(state.last_synced_timestamp);

        let per_page = self.options.records_per_page.max(1);
        let records: Vec<CallRecord> = batch
            .iter()
            .map(|e| CallRecord::from_entry(e, &config.mobile_number, &Local))
            .collect();
        let pages = paginate(&config, records, per_page);
        let page_ids = batch
            .chunks(per_page)
            .map(|chunk| chunk.iter().map(|e| e.id.clone()).collect::<Vec<CallId>>());

        for (page, ids) in pages.iter().zip(page_ids) {
            self.uploader.upload(page)?;
            self.cache.extend(ids);
            report.pages += 1;
        }

        let generation = state.reset_generation;
        let count = batch.len();
        let saved = self.store.update_sync_state(&mut |current| {
            if current.reset_generation == generation {
                current.advanced(newest, count)
            } else {
                current
            }
        })?;
        if saved.reset_generation != generation {
            info!("Sync state was reset during the cycle, keeping the reset watermark");
        }

        report.uploaded = count;
        report.watermark = saved.last_synced_timestamp;
        report.total_synced = saved.total_synced;
        Ok(report)
    }
}
