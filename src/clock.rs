use crate::{Duration, LocalDateTime, LocalTime};
use parking_lot::Mutex;
use std::sync::Arc;

/// A source of the current time.
///
/// Trackers never read the system clock on their own, so tests and
/// simulations can drive them with a [`ManualClock`].
pub trait Clock: Send + Sync {
    fn now(&self) -> LocalDateTime;
}

/// Reads the local wall clock through `chrono::Local`, the same time type
/// the rest of the crate uses.
///
/// A wall clock can step backwards. Trackers treat a time before the start
/// of their window as no elapsed time, so such a step never rolls a window
/// over.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> LocalDateTime {
        LocalTime::now()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same time, so one handle can be given to a tracker
/// and another kept by the caller to advance it.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<LocalDateTime>>,
}

impl ManualClock {
    pub fn new(start: LocalDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, now: LocalDateTime) {
        *self.now.lock() = now;
    }

    /// Moves the clock by `by`. A negative duration moves it backwards.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now = *now + by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(LocalTime::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> LocalDateTime {
        *self.now.lock()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> LocalDateTime {
        (**self).now()
    }
}
