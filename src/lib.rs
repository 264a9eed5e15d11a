pub mod clock;
pub mod error;
pub mod registry;
pub mod tracker;

mod grant;

use chrono::DateTime;
use error::BuilderError;

pub use clock::{Clock, ManualClock, SystemClock};
pub use grant::Grant;
pub use registry::{AdmissionRequest, AdmissionResponse, QuotaRegistry};
pub use tracker::{QuotaSnapshot, QuotaState, QuotaTracker};

pub(crate) use chrono::Local as LocalTime;
pub type LocalDateTime = DateTime<chrono::Local>;
pub type Duration = chrono::Duration;

#[derive(Debug)]
pub struct QuotaTrackerBuilder<C: Clock = SystemClock> {
    period: Option<Duration>,
    initial_quota: u64,
    clock: C,
}

impl QuotaTrackerBuilder<SystemClock> {
    pub fn new() -> Self {
        Self {
            period: None,
            initial_quota: 0,
            clock: SystemClock,
        }
    }
}

impl Default for QuotaTrackerBuilder<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> QuotaTrackerBuilder<C> {
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = Some(period);
        self
    }

    /// Budget filled into the first window when the tracker is built.
    pub fn with_initial_quota(mut self, amount: u64) -> Self {
        self.initial_quota = amount;
        self
    }

    pub fn with_clock<D: Clock>(self, clock: D) -> QuotaTrackerBuilder<D> {
        QuotaTrackerBuilder {
            period: self.period,
            initial_quota: self.initial_quota,
            clock,
        }
    }

    pub fn build(self) -> Result<QuotaTracker<C>, BuilderError> {
        let Some(period) = self.period else {
            return Err(BuilderError::PeriodNotConfiguredError);
        };

        if period <= Duration::zero() {
            return Err(BuilderError::NonPositivePeriodError);
        }

        let tracker = QuotaTracker::with_clock(period, self.clock);

        if self.initial_quota > 0 {
            tracker.fill(self.initial_quota)?;
        }

        Ok(tracker)
    }
}
