//! Consecutive-failure lockout tracking per identity
//!
//! The tracker sits between the verification flow and the lockout
//! repository. Failures accumulate across sessions; once the threshold is
//! reached the identity is refused until the cooldown deadline passes.
//! Expiry is lazy: nothing sweeps old locks, a check against a past
//! deadline simply treats the identity as unlocked.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use cb_shared::config::VerifyConfig;
use cb_shared::types::PhoneNumber;

use crate::domain::entities::lockout::{LockoutPolicy, LockoutState};
use crate::errors::DomainResult;
use crate::repositories::LockoutRepository;

/// Configuration for the lockout tracker
#[derive(Debug, Clone, Copy)]
pub struct LockoutConfig {
    /// Consecutive failures before the identity is locked
    pub max_failures: u32,
    /// Minutes the lock holds once tripped
    pub cooldown_minutes: i64,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_failures: 5,
            cooldown_minutes: 5,
        }
    }
}

impl From<&VerifyConfig> for LockoutConfig {
    fn from(config: &VerifyConfig) -> Self {
        Self {
            max_failures: config.lockout_max_failures,
            cooldown_minutes: config.lockout_cooldown_minutes,
        }
    }
}

impl LockoutConfig {
    fn policy(&self) -> LockoutPolicy {
        LockoutPolicy {
            max_failures: self.max_failures,
            cooldown: Duration::minutes(self.cooldown_minutes),
        }
    }
}

/// Tracks consecutive verification failures against the lockout repository
pub struct LockoutTracker<L>
where
    L: LockoutRepository,
{
    repository: Arc<L>,
    config: LockoutConfig,
}

impl<L> LockoutTracker<L>
where
    L: LockoutRepository,
{
    pub fn new(repository: Arc<L>, config: LockoutConfig) -> Self {
        Self { repository, config }
    }

    /// Seconds until the lock expires, `None` when the identity is not locked
    pub async fn is_locked(
        &self,
        phone: &PhoneNumber,
        now: DateTime<Utc>,
    ) -> DomainResult<Option<u64>> {
        let state = self.repository.find(phone).await?;
        Ok(state.and_then(|s| {
            if s.is_locked(now) {
                Some(s.remaining_lock_seconds(now))
            } else {
                None
            }
        }))
    }

    /// Count one consecutive failure, tripping the lock at the threshold
    pub async fn record_failure(
        &self,
        phone: &PhoneNumber,
        now: DateTime<Utc>,
    ) -> DomainResult<LockoutState> {
        self.repository
            .record_failure(phone, now, &self.config.policy())
            .await
    }

    /// Reset the counter and clear any lock after a success
    pub async fn record_success(
        &self,
        phone: &PhoneNumber,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.repository.record_success(phone, now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::MockLockoutRepository;

    fn phone() -> PhoneNumber {
        PhoneNumber::parse("+521234567890", "52").unwrap()
    }

    fn tracker(max_failures: u32) -> LockoutTracker<MockLockoutRepository> {
        LockoutTracker::new(
            Arc::new(MockLockoutRepository::new()),
            LockoutConfig {
                max_failures,
                cooldown_minutes: 5,
            },
        )
    }

    #[tokio::test]
    async fn locks_after_the_configured_failures() {
        let tracker = tracker(3);
        let now = Utc::now();

        for _ in 0..2 {
            tracker.record_failure(&phone(), now).await.unwrap();
            assert_eq!(tracker.is_locked(&phone(), now).await.unwrap(), None);
        }

        tracker.record_failure(&phone(), now).await.unwrap();
        let remaining = tracker.is_locked(&phone(), now).await.unwrap();
        assert_eq!(remaining, Some(300));
    }

    #[tokio::test]
    async fn lock_expires_lazily_after_cooldown() {
        let tracker = tracker(1);
        let now = Utc::now();

        tracker.record_failure(&phone(), now).await.unwrap();
        assert!(tracker.is_locked(&phone(), now).await.unwrap().is_some());

        let after = now + Duration::minutes(5);
        assert_eq!(tracker.is_locked(&phone(), after).await.unwrap(), None);
    }

    #[tokio::test]
    async fn success_resets_the_consecutive_count() {
        let tracker = tracker(3);
        let now = Utc::now();

        tracker.record_failure(&phone(), now).await.unwrap();
        tracker.record_failure(&phone(), now).await.unwrap();
        tracker.record_success(&phone(), now).await.unwrap();

        // Two more failures stay below the threshold of three
        tracker.record_failure(&phone(), now).await.unwrap();
        tracker.record_failure(&phone(), now).await.unwrap();
        assert_eq!(tracker.is_locked(&phone(), now).await.unwrap(), None);
    }

    #[tokio::test]
    async fn unknown_identity_is_not_locked() {
        let tracker = tracker(3);
        assert_eq!(
            tracker.is_locked(&phone(), Utc::now()).await.unwrap(),
            None
        );
    }
}
