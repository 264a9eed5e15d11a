use crate::clock::{Clock, SystemClock};
use crate::error::QuotaError;
use crate::grant::Grant;
use crate::{Duration, LocalDateTime};
use parking_lot::Mutex;
use std::fmt;

/// Bookkeeping for one budget over one rolling period.
///
/// Fills only ever touch `max_quota` and deductions only ever touch
/// `consumed`. The available quota is derived from both and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaState {
    period: Duration,
    period_start: LocalDateTime,
    max_quota: u64,
    consumed: u64,
}

impl QuotaState {
    /// Opens an empty window starting at `now`.
    pub fn new(period: Duration, now: LocalDateTime) -> Self {
        Self {
            period,
            period_start: now,
            max_quota: 0,
            consumed: 0,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn period_start(&self) -> LocalDateTime {
        self.period_start
    }

    pub fn max_quota(&self) -> u64 {
        self.max_quota
    }

    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// The end of the current window, or `None` if it lies past the last
    /// representable date.
    pub fn resets_at(&self) -> Option<LocalDateTime> {
        self.period_start.checked_add_signed(self.period)
    }

    /// Time since the window opened. A clock that went backwards counts as no time at all.
    fn elapsed(&self, now: &LocalDateTime) -> Duration {
        let elapsed = *now - self.period_start;

        if elapsed < Duration::zero() {
            return Duration::zero();
        }

        elapsed
    }

    fn warn_if_clock_behind(&self, now: &LocalDateTime) {
        if *now < self.period_start {
            tracing::warn!(
                period_start = %self.period_start,
                now = %now,
                "clock is behind the start of the quota window"
            );
        }
    }

    pub fn is_expired(&self, now: &LocalDateTime) -> bool {
        self.elapsed(now) > self.period
    }

    /// Quota that a deduction at `now` could take. An expired window has none.
    pub fn available(&self, now: &LocalDateTime) -> u64 {
        if self.is_expired(now) {
            return 0;
        }

        self.max_quota - self.consumed
    }

    /// Adds `amount` to the budget of the current window.
    ///
    /// If the window has expired a new one is opened at `now` and `amount`
    /// becomes its whole budget. Unused budget of the old window is dropped.
    pub fn fill(&mut self, amount: u64, now: &LocalDateTime) -> Result<(), QuotaError> {
        self.warn_if_clock_behind(now);

        if self.is_expired(now) {
            tracing::debug!(
                previous_start = %self.period_start,
                previous_max_quota = self.max_quota,
                previous_consumed = self.consumed,
                new_start = %now,
                "quota window rolled over"
            );

            self.period_start = *now;
            self.consumed = 0;
            self.max_quota = amount;
            return Ok(());
        }

        self.max_quota = self
            .max_quota
            .checked_add(amount)
            .ok_or(QuotaError::QuotaOverflow {
                max_quota: self.max_quota,
                amount,
            })?;

        Ok(())
    }

    /// Takes `amount` out of the current window, all or nothing.
    ///
    /// An expired window is left as it is: only a fill opens a new one.
    pub fn deduct(&mut self, amount: u64, now: &LocalDateTime) -> bool {
        self.warn_if_clock_behind(now);

        if self.is_expired(now) {
            tracing::debug!(
                requested = amount,
                period_start = %self.period_start,
                "quota window expired, not filled this period"
            );
            return false;
        }

        let available = self.max_quota - self.consumed;

        if amount > available {
            tracing::debug!(requested = amount, available, "not enough quota");
            return false;
        }

        self.consumed += amount;
        true
    }

    fn snapshot(&self, now: &LocalDateTime) -> QuotaSnapshot {
        QuotaSnapshot {
            period: self.period,
            period_start: self.period_start,
            max_quota: self.max_quota,
            consumed: self.consumed,
            expired: self.is_expired(now),
        }
    }
}

/// A point-in-time copy of a tracker's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaSnapshot {
    pub period: Duration,
    pub period_start: LocalDateTime,
    pub max_quota: u64,
    pub consumed: u64,
    pub expired: bool,
}

impl QuotaSnapshot {
    pub fn available(&self) -> u64 {
        if self.expired {
            return 0;
        }

        self.max_quota - self.consumed
    }
}

/// Governs one budget for one rolling period.
///
/// Every operation reads the clock and runs its whole check-then-mutate
/// sequence under a single lock, so a tracker can be shared between threads
/// behind an `Arc`.
pub struct QuotaTracker<C: Clock = SystemClock> {
    state: Mutex<QuotaState>,
    clock: C,
}

impl QuotaTracker<SystemClock> {
    /// Same as [`Self::with_clock()`] on the system clock. `period` must be positive.
    pub fn new(period: Duration) -> Self {
        Self::with_clock(period, SystemClock)
    }
}

impl<C: Clock> QuotaTracker<C> {
    /// Creates a tracker whose first window opens now, with no budget.
    ///
    /// `period` is not validated here and must be positive: with a zero or
    /// negative period every fill opens a new window and every deduct is
    /// denied. Use [`QuotaTrackerBuilder`](crate::QuotaTrackerBuilder) to get
    /// an error instead.
    pub fn with_clock(period: Duration, clock: C) -> Self {
        debug_assert!(period > Duration::zero(), "quota period must be positive");
        let now = clock.now();

        Self {
            state: Mutex::new(QuotaState::new(period, now)),
            clock,
        }
    }

    pub fn period(&self) -> Duration {
        self.state.lock().period()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Grants `amount` more budget. See [`QuotaState::fill`].
    pub fn fill(&self, amount: u64) -> Result<(), QuotaError> {
        let mut state = self.state.lock();
        let now = self.clock.now();
        state.fill(amount, &now)
    }

    /// Attempts to consume `amount`. Returns `false` without any change
    /// when the window is expired or holds less than `amount`.
    pub fn deduct(&self, amount: u64) -> bool {
        let mut state = self.state.lock();
        let now = self.clock.now();
        state.deduct(amount, &now)
    }

    /// Same as [`Self::deduct()`], but also reports what is left in the window.
    pub fn consume(&self, amount: u64) -> Grant {
        let mut state = self.state.lock();
        let now = self.clock.now();
        let accepted = state.deduct(amount, &now);

        Grant {
            requested: amount,
            accepted,
            remaining: state.available(&now),
            max_quota: state.max_quota(),
            resets_at: state.resets_at(),
        }
    }

    pub fn available(&self) -> u64 {
        let state = self.state.lock();
        state.available(&self.clock.now())
    }

    pub fn snapshot(&self) -> QuotaSnapshot {
        let state = self.state.lock();
        state.snapshot(&self.clock.now())
    }
}

impl<C: Clock> fmt::Display for QuotaTracker<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        write!(
            f,
            "QuotaTracker(max_quota={}, quota_consumed={})",
            state.max_quota(),
            state.consumed()
        )
    }
}

impl<C: Clock> fmt::Debug for QuotaTracker<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuotaTracker")
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}
