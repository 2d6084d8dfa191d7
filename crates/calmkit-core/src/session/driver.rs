//! Tokio driver that turns a [`WatchClock`] schedule into engine ticks.

use std::sync::{Arc, Weak};

use tokio::sync::{watch, Mutex};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use super::clock::{Recurrence, WatchClock};
use super::engine::{EngineSettings, SessionEngine};
use crate::events::SessionListener;

pub type SharedEngine<L> = Arc<Mutex<SessionEngine<WatchClock, L>>>;

/// Follows the engine's clock schedule and fires it on a tokio interval.
///
/// The driver only holds a weak reference to the engine. Once every
/// [`SharedEngine`] handle is dropped the clock goes with it and
/// [`run`](Self::run) returns.
pub struct SessionDriver<L> {
    engine: Weak<Mutex<SessionEngine<WatchClock, L>>>,
    schedule: watch::Receiver<Option<Recurrence>>,
}

impl<L: SessionListener + 'static> SessionDriver<L> {
    pub fn new(listener: L, settings: EngineSettings) -> (Self, SharedEngine<L>) {
        let (clock, schedule) = WatchClock::new();
        let engine = Arc::new(Mutex::new(SessionEngine::new(clock, listener, settings)));
        let driver = Self {
            engine: Arc::downgrade(&engine),
            schedule,
        };
        (driver, engine)
    }

    pub async fn run(self) {
        let SessionDriver {
            engine,
            mut schedule,
        } = self;

        loop {
            let current = *schedule.borrow_and_update();
            let Some(recurrence) = current else {
                if schedule.changed().await.is_err() {
                    debug!("session clock dropped; driver exiting");
                    return;
                }
                continue;
            };

            let mut interval = interval_at(Instant::now() + recurrence.period, recurrence.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let Some(engine) = engine.upgrade() else {
                            return;
                        };
                        engine.lock().await.fire(recurrence.handle);
                    }
                    changed = schedule.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        break;
                    }
                }
            }
        }
    }
}
