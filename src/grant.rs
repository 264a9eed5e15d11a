use crate::error::QuotaExceededError;
use crate::LocalDateTime;

/// The outcome of a single consume call against a quota tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub(crate) requested: u64,
    pub(crate) accepted: bool,
    pub(crate) remaining: u64,
    pub(crate) max_quota: u64,
    pub(crate) resets_at: Option<LocalDateTime>,
}

impl Grant {
    /// Returns whether the requested amount was deducted.
    pub fn is_accepted(&self) -> bool {
        self.accepted
    }

    /// Returns the quota still available after this call.
    pub fn get_remaining(&self) -> u64 {
        self.remaining
    }

    /// Returns the total budget of the window this call was evaluated in.
    pub fn get_max_quota(&self) -> u64 {
        self.max_quota
    }

    /// The moment the window ends. After it, only a fill grants new budget.
    /// `None` when the period reaches past the last representable date.
    pub fn get_resets_at(&self) -> Option<LocalDateTime> {
        self.resets_at
    }

    /// Same as [`Self::is_accepted()`], but will return Err(QuotaExceededError) if
    /// the requested amount could not be deducted.
    pub fn ensure_accepted(&self) -> Result<(), QuotaExceededError> {
        if !self.accepted {
            return Err(QuotaExceededError {
                requested: self.requested,
                available: self.remaining,
            });
        }

        Ok(())
    }
}
