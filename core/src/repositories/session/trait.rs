//! Verification session repository trait defining the persistence interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use cb_shared::types::PhoneNumber;

use crate::domain::entities::verification_session::{SessionStatus, VerificationSession};
use crate::errors::DomainError;

/// Repository trait for VerificationSession persistence operations
///
/// Every method that mutates state must be atomic with respect to other
/// calls for the same phone number. The compare-and-set methods return
/// `false`/`None` when the session already left the expected state, so
/// services can detect a concurrent transition without a global lock.
#[async_trait]
pub trait VerificationSessionRepository: Send + Sync {
    /// Insert a new pending session, expiring any prior pending session
    /// for the same phone number in the same atomic operation
    ///
    /// # Arguments
    /// * `session` - The new pending session to persist
    ///
    /// # Returns
    /// * Number of prior pending sessions that were expired (0 or 1 in
    ///   practice, since at most one pending session exists per phone)
    async fn insert_superseding(&self, session: &VerificationSession) -> Result<u64, DomainError>;

    /// Find the pending session for a phone number, if any
    async fn find_pending(
        &self,
        phone: &PhoneNumber,
    ) -> Result<Option<VerificationSession>, DomainError>;

    /// Transition a session out of `Pending` into a terminal state
    ///
    /// # Arguments
    /// * `id` - The session to transition
    /// * `to` - Target terminal state (Approved, Denied or Expired)
    ///
    /// # Returns
    /// * `true` if the session was pending and is now in the target state
    /// * `false` if the session does not exist or already left `Pending`
    async fn transition_from_pending(
        &self,
        id: Uuid,
        to: SessionStatus,
    ) -> Result<bool, DomainError>;

    /// Atomically increment the attempt counter of a pending session
    ///
    /// # Returns
    /// * `Some(new_count)` with the counter after the increment
    /// * `None` if the session does not exist or is no longer pending
    async fn increment_attempts(&self, id: Uuid) -> Result<Option<u32>, DomainError>;

    /// Find the most recent session for a phone number that reached
    /// `Approved` at or after `since` (compared against `updated_at`,
    /// which records the approval time)
    async fn find_approved_since(
        &self,
        phone: &PhoneNumber,
        since: DateTime<Utc>,
    ) -> Result<Option<VerificationSession>, DomainError>;
}
