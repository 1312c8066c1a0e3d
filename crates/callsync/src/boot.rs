//! Boot / restart trigger
//!
//! Brings the sync service back after a reboot or app update, provided the
//! device has been set up and the user left auto-start on.

use anyhow::Result;
use chrono::Utc;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

use crate::models::{BootOutcome, BootReason, BootRecord};
use crate::storage::SyncStore;

/// Starts the sync service (foreground service on Android)
pub trait ServiceLauncher: Send + Sync {
    fn launch(&self) -> Result<()>;
}

impl<F> ServiceLauncher for F
where
    F: Fn() -> Result<()> + Send + Sync,
{
    fn launch(&self) -> Result<()> {
        self()
    }
}

/// Retry policy for launching the service
#[derive(Debug, Clone)]
pub struct BootPolicy {
    pub max_attempts: u32,
    /// Fixed delay between failed attempts
    pub retry_delay: Duration,
}

impl Default for BootPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(5),
        }
    }
}

pub struct BootTrigger {
    store: Arc<dyn SyncStore>,
    policy: BootPolicy,
}

impl BootTrigger {
    pub fn new(store: Arc<dyn SyncStore>, policy: BootPolicy) -> Self {
        Self { store, policy }
    }

    /// Validate setup and launch the service with bounded retry.
    ///
    /// The outcome and attempt count are saved as a [`BootRecord`].
    pub fn on_boot(&self, reason: BootReason, launcher: &dyn ServiceLauncher) -> Result<BootOutcome> {
        let (outcome, attempts) = self.run(reason, launcher)?;

        self.store.save_boot_record(BootRecord {
            reason,
            attempts,
            outcome: outcome.clone(),
            at: Utc::now(),
        })?;

        Ok(outcome)
    }

    fn run(&self, reason: BootReason, launcher: &dyn ServiceLauncher) -> Result<(BootOutcome, u32)> {
        let config = self.store.get_device_config()?;
        let Some(config) = config.filter(|c| c.is_valid()) else {
            info!("Boot ({:?}): device not set up, not starting sync", reason);
            return Ok((BootOutcome::SkippedConfigInvalid, 0));
        };
        if !config.auto_start {
            info!("Boot ({:?}): auto-start disabled", reason);
            return Ok((BootOutcome::SkippedAutoStartDisabled, 0));
        }

        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = String::new();
        for attempt in 1..=max_attempts {
            match launcher.launch() {
                Ok(()) => {
                    info!("Boot ({:?}): sync service started on attempt {}", reason, attempt);
                    return Ok((BootOutcome::Started { attempt }, attempt));
                }
                Err(e) => {
                    warn!(
                        "Boot ({:?}): launch attempt {}/{} failed: {:#}",
                        reason, attempt, max_attempts, e
                    );
                    last_error = format!("{:#}", e);
                    if attempt < max_attempts {
                        std::thread::sleep(self.policy.retry_delay);
                    }
                }
            }
        }

        Ok((
            BootOutcome::Failed {
                attempts: max_attempts,
                error: last_error,
            },
            max_attempts,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeviceConfig;
    use crate::storage::InMemorySyncStore;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn instant_policy() -> BootPolicy {
        BootPolicy {
            max_attempts: 3,
            retry_delay: Duration::ZERO,
        }
    }

    fn configured_store() -> Arc<InMemorySyncStore> {
        Arc::new(InMemorySyncStore::with_device_config(DeviceConfig::new(
            "WH-1", "dev-1", "+15550100",
        )))
    }

    #[test]
    fn test_starts_first_try() {
        let store = configured_store();
        let trigger = BootTrigger::new(store.clone(), instant_policy());
        let launches = AtomicU32::new(0);
        let launcher = || -> Result<()> {
            launches.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };

        let outcome = trigger.on_boot(BootReason::BootCompleted, &launcher).unwrap();
        assert_eq!(outcome, BootOutcome::Started { attempt: 1 });
        assert_eq!(launches.load(Ordering::SeqCst), 1);

        let record = store.get_boot_record().unwrap().unwrap();
        assert_eq!(record.reason, BootReason::BootCompleted);
        assert_eq!(record.attempts, 1);
    }

    #[test]
    fn test_retries_then_succeeds() {
        let store = configured_store();
        let trigger = BootTrigger::new(store.clone(), instant_policy());
        let launches = AtomicU32::new(0);
        let launcher = || -> Result<()> {
            if launches.fetch_add(1, Ordering::SeqCst) < 2 {
                anyhow::bail!("foreground start not allowed yet");
            }
            Ok(())
        };

        let outcome = trigger.on_boot(BootReason::PackageReplaced, &launcher).unwrap();
        assert_eq!(outcome, BootOutcome::Started { attempt: 3 });
        assert_eq!(store.get_boot_record().unwrap().unwrap().attempts, 3);
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let store = configured_store();
        let trigger = BootTrigger::new(store.clone(), instant_policy());
        let launches = AtomicU32::new(0);
        let launcher = || -> Result<()> {
            launches.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("service crashed")
        };

        let outcome = trigger.on_boot(BootReason::BootCompleted, &launcher).unwrap();
        assert_eq!(
            outcome,
            BootOutcome::Failed {
                attempts: 3,
                error: "service crashed".to_string()
            }
        );
        assert_eq!(launches.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_skips_without_config() {
        let store = Arc::new(InMemorySyncStore::new());
        let trigger = BootTrigger::new(store.clone(), instant_policy());
        let launcher = || -> Result<()> { panic!("must not launch") };

        let outcome = trigger.on_boot(BootReason::BootCompleted, &launcher).unwrap();
        assert_eq!(outcome, BootOutcome::SkippedConfigInvalid);
        assert_eq!(store.get_boot_record().unwrap().unwrap().attempts, 0);
    }

    #[test]
    fn test_skips_when_auto_start_disabled() {
        let store = Arc::new(InMemorySyncStore::with_device_config(
            DeviceConfig::new("WH-1", "dev-1", "+15550100").with_auto_start(false),
        ));
        let trigger = BootTrigger::new(store, instant_policy());
        let launcher = || -> Result<()> { panic!("must not launch") };

        let outcome = trigger.on_boot(BootReason::BootCompleted, &launcher).unwrap();
        assert_eq!(outcome, BootOutcome::SkippedAutoStartDisabled);
    }
}
