//! Change-notification debouncing
//!
//! The platform reports several writes per call (insert, then cached name
//! and duration updates). The debouncer folds a burst into one trigger that
//! fires once the burst has been quiet for the settle delay.

use std::time::{Duration, Instant};

/// Default settle delay after the last change notification
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(3);

/// Cancellable, restartable settle timer
///
/// Time is passed in by the caller so the worker loop owns the clock.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
    pending_notifications: u32,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
            pending_notifications: 0,
        }
    }

    /// Record a change notification, restarting the settle timer
    pub fn notify(&mut self, now: Instant) {
        self.deadline = Some(now.checked_add(self.delay).unwrap_or(now));
        self.pending_notifications = self.pending_notifications.saturating_add(1);
    }

    /// Returns true exactly once per burst, after the delay has elapsed
    /// without a further notification.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.pending_notifications = 0;
                true
            }
            _ => false,
        }
    }

    /// Drop a pending trigger
    pub fn cancel(&mut self) {
        self.deadline = None;
        self.pending_notifications = 0;
    }

    /// When the pending trigger will fire, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Notifications folded into the pending trigger
    pub fn pending_notifications(&self) -> u32 {
        self.pending_notifications
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}
