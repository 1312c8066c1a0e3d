//! At-most-one-sync admission

use std::sync::atomic::{AtomicBool, Ordering};

/// In-progress flag checked before a cycle starts
///
/// A caller that finds a cycle already running is turned away rather than
/// queued. The flag is released when the returned permit drops, so every
/// exit path of a cycle (including unwinding) clears it.
#[derive(Debug, Default)]
pub struct SyncGate {
    in_progress: AtomicBool,
}

impl SyncGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the gate, or `None` if a cycle is already running
    pub fn try_enter(&self) -> Option<SyncPermit<'_>> {
        self.in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SyncPermit { gate: self })
    }

    pub fn is_syncing(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }
}

/// Proof that the holder owns the running cycle
#[must_use = "the gate is released as soon as the permit is dropped"]
#[derive(Debug)]
pub struct SyncPermit<'a> {
    gate: &'a SyncGate,
}

impl Drop for SyncPermit<'_> {
    fn drop(&mut self) {
        self.gate.in_progress.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[test]
    fn test_second_entry_is_refused() {
        let gate = SyncGate::new();
        let permit = gate.try_enter();
        assert!(permit.is_some());
        assert!(gate.is_syncing());
        assert!(gate.try_enter().is_none());

        drop(permit);
        assert!(!gate.is_syncing());
        assert!(gate.try_enter().is_some());
    }

    #[test]
    fn test_released_on_unwind() {
        let gate = SyncGate::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _permit = gate.try_enter().unwrap();
            panic!("cycle blew up");
        }));
        assert!(result.is_err());
        assert!(!gate.is_syncing());
    }

    #[test]
    fn test_concurrent_callers_admit_one() {
        let gate = Arc::new(SyncGate::new());
        let admitted = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(std::sync::Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = gate.clone();
                let admitted = admitted.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    if let Some(_permit) = gate.try_enter() {
                        admitted.fetch_add(1, Ordering::SeqCst);
                        // Hold the permit until everyone has tried
                        thread::sleep(std::time::Duration::from_millis(100));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(admitted.load(Ordering::SeqCst), 1);
    }
}
