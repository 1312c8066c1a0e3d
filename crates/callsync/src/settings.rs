//! Agent settings
//!
//! Loaded from (in order of priority):
//! 1. `CALLSYNC_API_BASE_URL` environment variable (endpoint only)
//! 2. JSON file (~/.config/callsync/agent.json)
//! 3. Built-in defaults

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::boot::BootPolicy;
use crate::models::DeviceConfig;
use crate::sync::{
    DEFAULT_CACHE_CAPACITY, DEFAULT_RECORDS_PER_PAGE, MAX_TIMER_INTERVAL, MIN_TIMER_INTERVAL,
    ServiceOptions, SyncOptions,
};

/// Settings filename in the config directory
const SETTINGS_FILE: &str = "agent.json";

/// Environment variable overriding the API base URL
const API_BASE_URL_ENV: &str = "CALLSYNC_API_BASE_URL";

/// Longest first-run lookback accepted (one year)
pub const MAX_LOOKBACK_HOURS: i64 = 366 * 24;

/// Tuning and endpoint settings for the agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Base URL of the backend; `api/lms/calls.php` is appended
    pub api_base_url: String,
    pub sync_interval_secs: u64,
    pub debounce_ms: u64,
    pub heartbeat_interval_secs: u64,
    pub sync_on_start: bool,
    /// Connect/send/receive timeout for each upload request
    pub http_timeout_secs: u64,
    pub records_per_page: usize,
    /// How far back a device that has never synced looks
    pub first_run_lookback_hours: i64,
    pub processed_cache_capacity: usize,
    pub boot_max_attempts: u32,
    pub boot_retry_delay_secs: u64,
    /// Call-log export the daemon reads
    pub call_log_path: Option<PathBuf>,
    /// Seeds the device registration when the store has none
    pub device: Option<DeviceConfig>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost".to_string(),
            sync_interval_secs: 600,
            debounce_ms: 3000,
            heartbeat_interval_secs: 60,
            sync_on_start: true,
            http_timeout_secs: 30,
            records_per_page: DEFAULT_RECORDS_PER_PAGE,
            first_run_lookback_hours: 24,
            processed_cache_capacity: DEFAULT_CACHE_CAPACITY,
            boot_max_attempts: 3,
            boot_retry_delay_secs: 5,
            call_log_path: None,
            device: None,
        }
    }
}

impl AgentSettings {
    /// Load settings from the config directory, then apply env overrides
    pub fn load() -> Result<Self> {
        let settings: Self = if config::config_exists(SETTINGS_FILE) {
            config::load_json(SETTINGS_FILE)?
        } else {
            Self::default()
        };
        settings
            .validate()
            .with_context(|| format!("Invalid settings in {}", SETTINGS_FILE))?;
        Ok(settings.with_env_overrides())
    }

    /// Load settings from a specific JSON file, then apply env overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let settings: Self = config::load_json_file(path)?;
        settings
            .validate()
            .with_context(|| format!("Invalid settings in {}", path.display()))?;
        Ok(settings.with_env_overrides())
    }

    /// Reject timer and window values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        let min_secs = MIN_TIMER_INTERVAL.as_secs();
        let max_secs = MAX_TIMER_INTERVAL.as_secs();
        ensure!(
            (min_secs..=max_secs).contains(&self.sync_interval_secs),
            "sync_interval_secs must be between {} and {}, got {}",
            min_secs,
            max_secs,
            self.sync_interval_secs
        );
        ensure!(
            (min_secs..=max_secs).contains(&self.heartbeat_interval_secs),
            "heartbeat_interval_secs must be between {} and {}, got {}",
            min_secs,
            max_secs,
            self.heartbeat_interval_secs
        );
        ensure!(
            self.debounce_ms <= MAX_TIMER_INTERVAL.as_millis() as u64,
            "debounce_ms must be at most {}, got {}",
            MAX_TIMER_INTERVAL.as_millis(),
            self.debounce_ms
        );
        ensure!(
            (0..=MAX_LOOKBACK_HOURS).contains(&self.first_run_lookback_hours),
            "first_run_lookback_hours must be between 0 and {}, got {}",
            MAX_LOOKBACK_HOURS,
            self.first_run_lookback_hours
        );
        Ok(())
    }

    /// Write these settings to the config directory
    pub fn save(&self) -> Result<()> {
        config::save_json(SETTINGS_FILE, self)
    }

    /// Write these settings to a specific JSON file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        config::save_json_file(path, self)
    }

    /// Default settings file path (~/.config/callsync/agent.json)
    pub fn default_settings_path() -> Option<PathBuf> {
        config::config_path(SETTINGS_FILE)
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(API_BASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.api_base_url = url;
            }
        }
        self
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            first_run_lookback: chrono::Duration::hours(
                self.first_run_lookback_hours.clamp(0, MAX_LOOKBACK_HOURS),
            ),
            records_per_page: self.records_per_page,
            cache_capacity: self.processed_cache_capacity,
        }
    }

    pub fn service_options(&self) -> ServiceOptions {
        ServiceOptions {
            sync_interval: Duration::from_secs(self.sync_interval_secs),
            debounce: Duration::from_millis(self.debounce_ms),
            heartbeat_interval: Duration::from_secs(self.heartbeat_interval_secs),
            sync_on_start: self.sync_on_start,
        }
        .clamped()
    }

    pub fn boot_policy(&self) -> BootPolicy {
        BootPolicy {
            max_attempts: self.boot_max_attempts,
            retry_delay: Duration::from_secs(self.boot_retry_delay_secs),
        }
    }
}
