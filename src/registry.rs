use crate::clock::{Clock, SystemClock};
use crate::error::RegistryError;
use crate::tracker::{QuotaSnapshot, QuotaTracker};
use crate::{Duration, Grant};
use dashmap::mapref::entry::Entry;
use dashmap::mapref::one::Ref;
use dashmap::DashMap;
use hashbrown::HashMap;

/// A request to spend `amount` from the quota registered under `key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionRequest {
    pub key: String,
    pub amount: u64,
}

impl AdmissionRequest {
    pub fn new<S: Into<String>>(key: S, amount: u64) -> Self {
        Self {
            key: key.into(),
            amount,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionResponse {
    pub granted: bool,
    pub remaining: u64,
}

impl From<&Grant> for AdmissionResponse {
    fn from(grant: &Grant) -> Self {
        Self {
            granted: grant.is_accepted(),
            remaining: grant.get_remaining(),
        }
    }
}

/// Independent quota trackers, one per resource key.
///
/// Keys are added with an explicit [`register`](Self::register) call. All
/// trackers read time from clones of the registry clock.
pub struct QuotaRegistry<C: Clock + Clone = SystemClock> {
    trackers: DashMap<String, QuotaTracker<C>>,
    clock: C,
}

impl QuotaRegistry<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for QuotaRegistry<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock + Clone> QuotaRegistry<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            trackers: DashMap::new(),
            clock,
        }
    }

    pub fn register<S: Into<String>>(&self, key: S, period: Duration) -> Result<(), RegistryError> {
        let key = key.into();

        if key.is_empty() {
            return Err(RegistryError::EmptyKeyError);
        }

        if period <= Duration::zero() {
            return Err(RegistryError::NonPositivePeriodError);
        }

        match self.trackers.entry(key) {
            Entry::Occupied(entry) => {
                Err(RegistryError::DuplicateKeyError(entry.key().clone()))
            }
            Entry::Vacant(entry) => {
                tracing::debug!(key = %entry.key(), %period, "registered quota");
                entry.insert(QuotaTracker::with_clock(period, self.clock.clone()));
                Ok(())
            }
        }
    }

    /// Returns `true` if a quota was registered under `key`.
    pub fn unregister(&self, key: &str) -> bool {
        self.trackers.remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.trackers.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }

    pub fn fill(&self, key: &str, amount: u64) -> Result<(), RegistryError> {
        let tracker = self.get(key)?;
        tracker.fill(amount)?;
        Ok(())
    }

    pub fn deduct(&self, key: &str, amount: u64) -> Result<bool, RegistryError> {
        Ok(self.get(key)?.deduct(amount))
    }

    pub fn consume(&self, key: &str, amount: u64) -> Result<Grant, RegistryError> {
        Ok(self.get(key)?.consume(amount))
    }

    pub fn admit(&self, request: &AdmissionRequest) -> Result<AdmissionResponse, RegistryError> {
        let grant = self.consume(&request.key, request.amount)?;
        Ok(AdmissionResponse::from(&grant))
    }

    pub fn snapshot(&self, key: &str) -> Result<QuotaSnapshot, RegistryError> {
        Ok(self.get(key)?.snapshot())
    }

    pub fn snapshot_all(&self) -> HashMap<String, QuotaSnapshot> {
        self.trackers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().snapshot()))
            .collect()
    }

    fn get(&self, key: &str) -> Result<Ref<'_, String, QuotaTracker<C>>, RegistryError> {
        self.trackers
            .get(key)
            .ok_or_else(|| RegistryError::UnknownKeyError(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn registry() -> (QuotaRegistry<ManualClock>, ManualClock) {
        let clock = ManualClock::default();
        (QuotaRegistry::with_clock(clock.clone()), clock)
    }

    #[test]
    fn register_rejects_bad_input() {
        let (registry, _) = registry();

        assert_eq!(
            registry.register("", Duration::seconds(1)),
            Err(RegistryError::EmptyKeyError)
        );
        assert_eq!(
            registry.register("api", Duration::zero()),
            Err(RegistryError::NonPositivePeriodError)
        );

        registry.register("api", Duration::seconds(1)).unwrap();
        assert_eq!(
            registry.register("api", Duration::seconds(5)),
            Err(RegistryError::DuplicateKeyError("api".to_string()))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unknown_key_is_an_error() {
        let (registry, _) = registry();

        assert_eq!(
            registry.deduct("missing", 1),
            Err(RegistryError::UnknownKeyError("missing".to_string()))
        );
        assert!(registry.fill("missing", 1).is_err());
        assert!(registry.snapshot("missing").is_err());
    }

    #[test]
    fn keys_do_not_share_budget() {
        let (registry, _) = registry();
        registry.register("reads", Duration::seconds(60)).unwrap();
        registry.register("writes", Duration::seconds(60)).unwrap();

        registry.fill("reads", 10).unwrap();

        assert_eq!(registry.deduct("writes", 1), Ok(false));
        assert_eq!(registry.deduct("reads", 10), Ok(true));
        assert_eq!(registry.snapshot("writes").unwrap().consumed, 0);
    }

    #[test]
    fn admit_maps_grant_to_response() {
        let (registry, _) = registry();
        registry.register("api", Duration::seconds(60)).unwrap();
        registry.fill("api", 5).unwrap();

        let response = registry.admit(&AdmissionRequest::new("api", 3)).unwrap();
        assert_eq!(
            response,
            AdmissionResponse {
                granted: true,
                remaining: 2,
            }
        );

        let response = registry.admit(&AdmissionRequest::new("api", 3)).unwrap();
        assert_eq!(
            response,
            AdmissionResponse {
                granted: false,
                remaining: 2,
            }
        );
    }

    #[test]
    fn trackers_follow_registry_clock() {
        let (registry, clock) = registry();
        registry.register("api", Duration::seconds(1)).unwrap();
        registry.fill("api", 5).unwrap();

        clock.advance(Duration::seconds(2));
        assert_eq!(registry.deduct("api", 1), Ok(false));

        let all = registry.snapshot_all();
        assert!(all["api"].expired);
    }

    #[test]
    fn admit_with_unbounded_period() {
        let (registry, _) = registry();
        registry.register("api", Duration::MAX).unwrap();
        registry.fill("api", 10).unwrap();

        let response = registry.admit(&AdmissionRequest::new("api", 4)).unwrap();
        assert_eq!(
            response,
            AdmissionResponse {
                granted: true,
                remaining: 6,
            }
        );
        assert_eq!(registry.consume("api", 1).unwrap().get_resets_at(), None);
    }

    #[test]
    fn unregister_removes_key() {
        let (registry, _) = registry();
        registry.register("api", Duration::seconds(1)).unwrap();

        assert!(registry.unregister("api"));
        assert!(!registry.unregister("api"));
        assert!(!registry.contains("api"));
        assert!(registry.is_empty());
    }
}
