//! Scoped wake-lock acquisition

use log::trace;

/// Platform mechanism that keeps the CPU running during a bounded operation
pub trait WakeLock: Send + Sync {
    fn acquire(&self, tag: &str);
    fn release(&self, tag: &str);
}

/// Wake lock for hosts without one (desktop daemon, tests)
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopWakeLock;

impl WakeLock for NoopWakeLock {
    fn acquire(&self, tag: &str) {
        trace!("wake lock acquire ({})", tag);
    }

    fn release(&self, tag: &str) {
        trace!("wake lock release ({})", tag);
    }
}

/// Holds a wake lock until dropped
#[must_use = "the wake lock is released as soon as the guard is dropped"]
pub struct WakeLockGuard<'a> {
    lock: &'a dyn WakeLock,
    tag: &'static str,
}

impl<'a> WakeLockGuard<'a> {
    pub fn acquire(lock: &'a dyn WakeLock, tag: &'static str) -> Self {
        lock.acquire(tag);
        Self { lock, tag }
    }
}

impl Drop for WakeLockGuard<'_> {
    fn drop(&mut self) {
        self.lock.release(self.tag);
    }
}
