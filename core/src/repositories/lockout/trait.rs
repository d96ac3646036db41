//! Lockout state repository trait defining the persistence interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use cb_shared::types::PhoneNumber;

use crate::domain::entities::lockout::{LockoutPolicy, LockoutState};
use crate::errors::DomainError;

/// Repository trait for per-identity lockout counters
///
/// `record_failure` must be one atomic read-modify-write so that two
/// concurrent failures for the same phone cannot both observe the
/// pre-threshold count and neither trip the lock.
#[async_trait]
pub trait LockoutRepository: Send + Sync {
    /// Register one consecutive failure and return the resulting state
    ///
    /// # Arguments
    /// * `phone` - The identity the failure belongs to
    /// * `now` - Failure timestamp; also used for lazy expiry of a stale lock
    /// * `policy` - Threshold and cooldown to apply when the counter trips
    async fn record_failure(
        &self,
        phone: &PhoneNumber,
        now: DateTime<Utc>,
        policy: &LockoutPolicy,
    ) -> Result<LockoutState, DomainError>;

    /// Clear the failure counter and any active lock after a success
    async fn record_success(
        &self,
        phone: &PhoneNumber,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError>;

    /// Load the current lockout state for an identity, if one exists
    async fn find(&self, phone: &PhoneNumber) -> Result<Option<LockoutState>, DomainError>;
}
