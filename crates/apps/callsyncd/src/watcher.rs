//! Call-log export watcher
//!
//! Stands in for the platform content observer: polls the export file and
//! reports every change. Bursts collapse in the service's debouncer.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use log::{debug, info};
use tokio::sync::mpsc;
use tokio::time::{Duration, MissedTickBehavior, interval};

/// What we compare between polls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    modified: Option<SystemTime>,
    len: u64,
}

async fn fingerprint(path: &Path) -> Option<Fingerprint> {
    let meta = tokio::fs::metadata(path).await.ok()?;
    Some(Fingerprint {
        modified: meta.modified().ok(),
        len: meta.len(),
    })
}

pub struct ExportWatcher {
    path: PathBuf,
    poll: Duration,
}

impl ExportWatcher {
    pub fn new(path: PathBuf, poll: Duration) -> Self {
        Self { path, poll }
    }

    /// Poll until `shutdown_rx` fires, calling `on_change` whenever the file
    /// appears, disappears or its size/mtime changes.
    pub async fn run<F>(self, on_change: F, mut shutdown_rx: mpsc::Receiver<()>)
    where
        F: Fn() + Send,
    {
        let mut ticker = interval(self.poll);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last = fingerprint(&self.path).await;
        info!("Watching {} for call-log changes", self.path.display());

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let current = fingerprint(&self.path).await;
                    if current != last {
                        debug!("Call-log export changed");
                        last = current;
                        on_change();
                    }
                }
                _ = shutdown_rx.recv() => {
                    debug!("Export watcher shutting down");
                    break;
                }
            }
        }
    }
}
