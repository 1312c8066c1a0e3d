//! Background sync service
//!
//! A single worker thread drives the periodic timer, the change debouncer
//! and the heartbeat. On-demand syncs may also run on the caller's thread;
//! the [`SyncGate`] keeps every source down to one cycle at a time.

use anyhow::{Context, Result};
use chrono::Utc;
use log::{debug, error, info, warn};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::debounce::{DEFAULT_DEBOUNCE, Debouncer};
use super::engine::{SyncEngine, SyncReport};
use super::gate::SyncGate;
use super::status::{StatusSink, SyncStatus};
use super::wakelock::{WakeLock, WakeLockGuard};
use crate::error::SyncError;

const SYNC_WAKE_TAG: &str = "callsync:sync";
const HEARTBEAT_WAKE_TAG: &str = "callsync:heartbeat";

/// Shortest period the periodic sync and heartbeat run at
pub const MIN_TIMER_INTERVAL: Duration = Duration::from_secs(1);

/// Longest period any service timer runs at
pub const MAX_TIMER_INTERVAL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Timers for the sync service
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceOptions {
    /// Periodic sync interval
    pub sync_interval: Duration,
    /// Settle delay after the last change notification
    pub debounce: Duration,
    pub heartbeat_interval: Duration,
    /// Run one cycle as soon as the service starts
    pub sync_on_start: bool,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(600),
            debounce: DEFAULT_DEBOUNCE,
            heartbeat_interval: Duration::from_secs(60),
            sync_on_start: true,
        }
    }
}

impl ServiceOptions {
    /// Bring every timer into the range the worker can run
    pub fn clamped(mut self) -> Self {
        self.sync_interval = self
            .sync_interval
            .clamp(MIN_TIMER_INTERVAL, MAX_TIMER_INTERVAL);
        self.heartbeat_interval = self
            .heartbeat_interval
            .clamp(MIN_TIMER_INTERVAL, MAX_TIMER_INTERVAL);
        self.debounce = self.debounce.min(MAX_TIMER_INTERVAL);
        self
    }
}

/// What caused a sync attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Startup,
    Periodic,
    ContentChange,
    Manual,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Trigger::Startup => "startup",
            Trigger::Periodic => "periodic",
            Trigger::ContentChange => "content change",
            Trigger::Manual => "manual",
        };
        f.write_str(name)
    }
}

/// Orchestrator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Syncing,
    /// Not syncing; the last cycle failed
    Error,
}

/// Result of asking for a sync
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Completed(SyncReport),
    Failed(SyncError),
    /// Another cycle was already running; the request was dropped
    Skipped,
}

enum Command {
    ContentChanged,
    SyncRequested,
    Shutdown,
}

struct Shared {
    engine: Mutex<SyncEngine>,
    gate: SyncGate,
    phase: Mutex<SyncPhase>,
    wake_lock: Arc<dyn WakeLock>,
    status: Arc<dyn StatusSink>,
}

impl Shared {
    fn lock_engine(&self) -> MutexGuard<'_, SyncEngine> {
        // A panic inside a cycle poisons the lock; the engine itself holds no
        // half-written state worth refusing over.
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_phase(&self, phase: SyncPhase) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = phase;
    }

    fn phase(&self) -> SyncPhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn try_sync(&self, trigger: Trigger) -> SyncOutcome {
        let Some(_permit) = self.gate.try_enter() else {
            debug!("Sync already in progress, dropping {} trigger", trigger);
            return SyncOutcome::Skipped;
        };
        let _wake = WakeLockGuard::acquire(self.wake_lock.as_ref(), SYNC_WAKE_TAG);

        self.set_phase(SyncPhase::Syncing);
        self.status.update(&SyncStatus::Syncing);
        debug!("Sync started ({})", trigger);

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.lock_engine().run_cycle()))
            .unwrap_or_else(|payload| {
                let err = SyncError::Unexpected(panic_message(payload.as_ref()));
                self.lock_engine().record_failure(&err);
                Err(err)
            });

        match result {
            Ok(report) => {
                self.set_phase(SyncPhase::Idle);
                self.status.update(&SyncStatus::Synced {
                    count: report.uploaded,
                    at: Utc::now(),
                    total: report.total_synced,
                });
                SyncOutcome::Completed(report)
            }
            Err(e) => {
                self.set_phase(SyncPhase::Error);
                self.status.update(&SyncStatus::Failed {
                    reason: e.to_string(),
                });
                SyncOutcome::Failed(e)
            }
        }
    }

    fn heartbeat(&self) {
        let _wake = WakeLockGuard::acquire(self.wake_lock.as_ref(), HEARTBEAT_WAKE_TAG);
        match self.lock_engine().record_heartbeat() {
            Ok(()) => debug!("Heartbeat recorded"),
            Err(e) => warn!("Failed to record heartbeat: {:#}", e),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic during sync: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic during sync: {}", s)
    } else {
        "panic during sync".to_string()
    }
}

/// Running sync service
///
/// Dropping the service stops the worker.
pub struct SyncService {
    shared: Arc<Shared>,
    tx: Mutex<Option<Sender<Command>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SyncService {
    /// Start the worker thread and count the start in the sync state
    pub fn start(
        engine: SyncEngine,
        wake_lock: Arc<dyn WakeLock>,
        status: Arc<dyn StatusSink>,
        options: ServiceOptions,
    ) -> Result<Self> {
        engine
            .record_service_start()
            .context("Failed to record service start")?;

        let clamped = options.clone().clamped();
        if clamped != options {
            warn!("Service timers out of range, using {:?}", clamped);
        }
        let options = clamped;

        let shared = Arc::new(Shared {
            engine: Mutex::new(engine),
            gate: SyncGate::new(),
            phase: Mutex::new(SyncPhase::Idle),
            wake_lock,
            status,
        });

        let (tx, rx) = mpsc::channel();
        let worker_shared = shared.clone();
        let worker = thread::Builder::new()
            .name("callsync-worker".to_string())
            .spawn(move || run_worker(worker_shared, rx, options))
            .context("Failed to spawn sync worker")?;

        info!("Sync service started");
        Ok(Self {
            shared,
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        })
    }

    fn send(&self, command: Command) -> bool {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        match tx.as_ref() {
            Some(tx) => tx.send(command).is_ok(),
            None => false,
        }
    }

    /// Report a call-log change; the sync runs once changes settle
    pub fn notify_change(&self) {
        if !self.send(Command::ContentChanged) {
            debug!("Ignoring change notification, service stopped");
        }
    }

    /// Ask the worker for a sync without waiting for it
    pub fn request_sync(&self) {
        if !self.send(Command::SyncRequested) {
            debug!("Ignoring sync request, service stopped");
        }
    }

    /// Run a sync on the calling thread.
    ///
    /// Returns [`SyncOutcome::Skipped`] if a cycle is already running.
    pub fn sync_now(&self) -> SyncOutcome {
        self.shared.try_sync(Trigger::Manual)
    }

    pub fn phase(&self) -> SyncPhase {
        self.shared.phase()
    }

    pub fn is_syncing(&self) -> bool {
        self.shared.gate.is_syncing()
    }

    pub fn is_running(&self) -> bool {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Stop the worker and wait for an in-flight cycle to finish
    pub fn stop(&self) {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
        let Some(tx) = tx else {
            return;
        };
        let _ = tx.send(Command::Shutdown);

        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            if worker.join().is_err() {
                error!("Sync worker panicked");
            }
        }

        self.shared.status.update(&SyncStatus::Stopped);
        info!("Sync service stopped");
    }
}

impl Drop for SyncService {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker(shared: Arc<Shared>, rx: mpsc::Receiver<Command>, options: ServiceOptions) {
    let mut debouncer = Debouncer::new(options.debounce);
    let started = Instant::now();
    let mut next_sync = if options.sync_on_start {
        started
    } else {
        deadline_after(started, options.sync_interval)
    };
    let mut next_heartbeat = deadline_after(started, options.heartbeat_interval);
    let mut first_cycle = options.sync_on_start;

    shared.status.update(&SyncStatus::Waiting);

    loop {
        let mut wake_at = next_sync.min(next_heartbeat);
        if let Some(deadline) = debouncer.deadline() {
            wake_at = wake_at.min(deadline);
        }

        match rx.recv_timeout(wake_at.saturating_duration_since(Instant::now())) {
            Ok(Command::ContentChanged) => debouncer.notify(Instant::now()),
            Ok(Command::SyncRequested) => {
                shared.try_sync(Trigger::Manual);
            }
            Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        let now = Instant::now();
        if debouncer.poll(now) {
            shared.try_sync(Trigger::ContentChange);
        }
        if now >= next_sync {
            let trigger = if first_cycle {
                Trigger::Startup
            } else {
                Trigger::Periodic
            };
            first_cycle = false;
            shared.try_sync(trigger);
            next_sync = deadline_after(Instant::now(), options.sync_interval);
        }
        if now >= next_heartbeat {
            shared.heartbeat();
            next_heartbeat = deadline_after(Instant::now(), options.heartbeat_interval);
        }
    }

    debouncer.cancel();
    debug!("Sync worker exiting");
}

/// Next firing time, never earlier than one minimum interval from `from`
fn deadline_after(from: Instant, interval: Duration) -> Instant {
    let interval = interval.max(MIN_TIMER_INTERVAL);
    from.checked_add(interval)
        .or_else(|| from.checked_add(MAX_TIMER_INTERVAL))
        .unwrap_or(from + MIN_TIMER_INTERVAL)
}
