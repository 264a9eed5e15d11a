#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BuilderError {
    #[error("The quota period is not configured")]
    PeriodNotConfiguredError,

    #[error("The quota period must be longer than zero")]
    NonPositivePeriodError,

    #[error(transparent)]
    QuotaError(#[from] QuotaError),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QuotaError {
    #[error("Cannot fill {amount} on top of a budget of {max_quota}: the budget would overflow")]
    QuotaOverflow {
        max_quota: u64,
        amount: u64,
    },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("The resource key is empty")]
    EmptyKeyError,

    #[error("The quota period must be longer than zero")]
    NonPositivePeriodError,

    #[error("A quota is already registered for `{0}`")]
    DuplicateKeyError(String),

    #[error("No quota is registered for `{0}`")]
    UnknownKeyError(String),

    #[error(transparent)]
    QuotaError(#[from] QuotaError),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Not enough quota: requested {requested}, available {available}")]
pub struct QuotaExceededError {
    pub requested: u64,
    pub available: u64,
}
