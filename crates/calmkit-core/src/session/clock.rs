//! Clock abstraction driving the session engine.
//!
//! The engine never sleeps or spawns anything itself. It asks a [`Clock`] to
//! fire at a period and cancels the returned handle when the session ends.
//! Whoever owns the clock calls [`SessionEngine::fire`] with that handle.
//!
//! [`SessionEngine::fire`]: super::SessionEngine::fire

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Identifies one scheduled recurrence. Handles are never reused by a clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClockHandle(u64);

impl ClockHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

/// A recurring schedule as published by a clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recurrence {
    pub handle: ClockHandle,
    pub period: Duration,
}

pub trait Clock {
    /// Start firing every `period`. Replaces whatever was scheduled before.
    fn schedule(&mut self, period: Duration) -> ClockHandle;

    /// Stop the recurrence identified by `handle`. Unknown handles are ignored.
    fn cancel(&mut self, handle: ClockHandle);
}

/// Deterministic clock that only records what is scheduled.
///
/// Clones share state, so a test can keep one copy while the engine owns
/// another and inspect the active recurrence at any point.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    inner: Arc<Mutex<ManualInner>>,
}

#[derive(Debug, Default)]
struct ManualInner {
    next_id: u64,
    active: Option<Recurrence>,
    cancelled: Vec<ClockHandle>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<Recurrence> {
        self.lock().active
    }

    /// Handles cancelled so far, in order.
    pub fn cancelled(&self) -> Vec<ClockHandle> {
        self.lock().cancelled.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualInner> {
        // Poisoning only happens if a test panicked mid-update.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Clock for ManualClock {
    fn schedule(&mut self, period: Duration) -> ClockHandle {
        let mut inner = self.lock();
        inner.next_id += 1;
        let handle = ClockHandle(inner.next_id);
        inner.active = Some(Recurrence { handle, period });
        handle
    }

    fn cancel(&mut self, handle: ClockHandle) {
        let mut inner = self.lock();
        if inner.active.map(|r| r.handle) == Some(handle) {
            inner.active = None;
        }
        inner.cancelled.push(handle);
    }
}

/// Clock that publishes its recurrence on a watch channel for
/// [`SessionDriver`](super::SessionDriver) to follow.
#[derive(Debug)]
pub struct WatchClock {
    next_id: u64,
    tx: watch::Sender<Option<Recurrence>>,
}

impl WatchClock {
    pub fn new() -> (Self, watch::Receiver<Option<Recurrence>>) {
        let (tx, rx) = watch::channel(None);
        (Self { next_id: 0, tx }, rx)
    }
}

impl Clock for WatchClock {
    fn schedule(&mut self, period: Duration) -> ClockHandle {
        self.next_id += 1;
        let handle = ClockHandle(self.next_id);
        self.tx.send_replace(Some(Recurrence { handle, period }));
        handle
    }

    fn cancel(&mut self, handle: ClockHandle) {
        self.tx.send_if_modified(|current| {
            if current.map(|r| r.handle) == Some(handle) {
                *current = None;
                true
            } else {
                false
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_replaces_and_cancels() {
        let mut clock = ManualClock::new();
        let first = clock.schedule(Duration::from_secs(1));
        let second = clock.schedule(Duration::from_secs(3));
        assert_ne!(first, second);

        clock.cancel(first);
        assert_eq!(clock.active().map(|r| r.handle), Some(second));

        clock.cancel(second);
        assert!(clock.active().is_none());
        assert_eq!(clock.cancelled(), vec![first, second]);
    }

    #[test]
    fn watch_clock_publishes_schedule() {
        let (mut clock, rx) = WatchClock::new();
        assert!(rx.borrow().is_none());

        let handle = clock.schedule(Duration::from_millis(500));
        assert_eq!(
            *rx.borrow(),
            Some(Recurrence {
                handle,
                period: Duration::from_millis(500)
            })
        );

        clock.cancel(ClockHandle::new(999));
        assert!(rx.borrow().is_some());

        clock.cancel(handle);
        assert!(rx.borrow().is_none());
    }
}
