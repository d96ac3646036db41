//! Transfer request repository trait defining the persistence interface.
//!
//! The record-then-execute protocol leans entirely on this trait: `record`
//! is the only insert path and enforces the `(phone, idempotency_token)`
//! uniqueness that makes duplicate submissions detectable, while the
//! `mark_*` methods are compare-and-set transitions that at most one
//! caller can win.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use cb_shared::types::PhoneNumber;

use crate::domain::entities::transfer_request::TransferRequest;
use crate::errors::DomainError;

/// Result of attempting to record a transfer request
#[derive(Debug, Clone)]
pub enum RecordOutcome {
    /// No prior request with this `(phone, token)` pair existed;
    /// the caller owns execution
    Created,

    /// A prior request exists; the stored row is returned so the caller
    /// can replay its outcome or report a duplicate
    Existing(TransferRequest),
}

/// Repository trait for TransferRequest persistence operations
#[async_trait]
pub trait TransferRepository: Send + Sync {
    /// Insert a transfer request unless one already exists for the same
    /// `(phone, idempotency_token)` pair
    ///
    /// # Returns
    /// * `RecordOutcome::Created` when this call inserted the row
    /// * `RecordOutcome::Existing` with the stored row when the pair
    ///   was already present (the insert is not retried)
    async fn record(&self, request: &TransferRequest) -> Result<RecordOutcome, DomainError>;

    /// Load a request by its idempotency pair
    async fn find_by_token(
        &self,
        phone: &PhoneNumber,
        token: &str,
    ) -> Result<Option<TransferRequest>, DomainError>;

    /// Finalize a recorded request as executed
    ///
    /// # Returns
    /// * `true` if the row was in `Recorded` and is now `Executed`
    /// * `false` if another caller finalized it first
    async fn mark_executed(
        &self,
        id: Uuid,
        outcome_ref: &str,
        executed_at: DateTime<Utc>,
    ) -> Result<bool, DomainError>;

    /// Finalize a recorded request as rejected, keeping the reason
    ///
    /// # Returns
    /// * `true` if the row was in `Recorded` and is now `Rejected`
    /// * `false` if another caller finalized it first
    async fn mark_rejected(&self, id: Uuid, reason: &str) -> Result<bool, DomainError>;

    /// Move a parked request from `RequiresVerification` to `Recorded`
    ///
    /// # Returns
    /// * `true` if this call won the promotion
    /// * `false` if the row already left `RequiresVerification`
    async fn promote_to_recorded(&self, id: Uuid) -> Result<bool, DomainError>;

    /// Find the oldest request still parked in `RequiresVerification`
    /// for a phone number
    async fn find_oldest_awaiting(
        &self,
        phone: &PhoneNumber,
    ) -> Result<Option<TransferRequest>, DomainError>;
}
