//! Transfer service: two-factor gating and exactly-once execution
//!
//! The flow is record-then-execute: a durable `TransferRequest` keyed by
//! `(identity, idempotency token)` is written before the ledger is called,
//! so a crash between the two is distinguishable from "never attempted".
//! Duplicate submissions find the stored row and replay its outcome; a row
//! still in flight reports InProgress instead of executing twice. Terminal
//! outcomes replay as-is, rejections included.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;

use cb_shared::types::PhoneNumber;

use crate::domain::entities::audit::{AuditEventType, AuditRecord};
use crate::domain::entities::transfer_request::{TransferRequest, TransferStatus};
use crate::errors::{DomainError, DomainResult, TransferError};
use crate::repositories::{
    AuditLogRepository, RecordOutcome, TransferRepository, VerificationSessionRepository,
};
use crate::services::audit::AuditService;
use crate::services::transfer::config::TransferServiceConfig;
use crate::services::transfer::traits::{BalanceInfo, LedgerError, LedgerExecutor};
use crate::services::transfer::types::{TransferOutcome, TransferSubmission};

/// Decides whether a submission needs verification before it may execute
///
/// A transfer at or above the configured threshold requires an Approved
/// verification no older than the recency window; below the threshold it
/// proceeds directly. The recency check reads the approval time
/// (`updated_at`), not the session creation time.
pub struct TwoFactorGate<S>
where
    S: VerificationSessionRepository,
{
    sessions: Arc<S>,
    threshold: Decimal,
    recency: Duration,
}

impl<S> TwoFactorGate<S>
where
    S: VerificationSessionRepository,
{
    pub fn new(sessions: Arc<S>, threshold: Decimal, recency_minutes: i64) -> Self {
        Self {
            sessions,
            threshold,
            recency: Duration::minutes(recency_minutes),
        }
    }

    /// Whether the identity holds an Approved verification inside the window
    pub async fn has_recent_approval(
        &self,
        phone: &PhoneNumber,
        now: DateTime<Utc>,
    ) -> DomainResult<bool> {
        Ok(self
            .sessions
            .find_approved_since(phone, now - self.recency)
            .await?
            .is_some())
    }

    /// Whether this submission must wait for a verification
    pub async fn requires_challenge(
        &self,
        phone: &PhoneNumber,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> DomainResult<bool> {
        if amount < self.threshold {
            return Ok(false);
        }
        Ok(!self.has_recent_approval(phone, now).await?)
    }
}

/// Orchestrates gated, idempotent transfer execution against the ledger
pub struct TransferService<T, X, S, A>
where
    T: TransferRepository,
    X: LedgerExecutor,
    S: VerificationSessionRepository,
    A: AuditLogRepository + 'static,
{
    transfers: Arc<T>,
    ledger: Arc<X>,
    gate: TwoFactorGate<S>,
    audit: AuditService<A>,
    config: TransferServiceConfig,
}

impl<T, X, S, A> TransferService<T, X, S, A>
where
    T: TransferRepository,
    X: LedgerExecutor,
    S: VerificationSessionRepository,
    A: AuditLogRepository + 'static,
{
    /// Create a new transfer service
    pub fn new(
        transfers: Arc<T>,
        ledger: Arc<X>,
        sessions: Arc<S>,
        audit: AuditService<A>,
        config: TransferServiceConfig,
    ) -> Self {
        let gate = TwoFactorGate::new(
            sessions,
            config.two_factor_threshold,
            config.verification_recency_minutes,
        );
        Self {
            transfers,
            ledger,
            gate,
            audit,
            config,
        }
    }

    /// The two-factor gate, shared with surfaces that need its primitives
    pub fn gate(&self) -> &TwoFactorGate<S> {
        &self.gate
    }

    /// Submit a transfer for execution
    ///
    /// Exactly-once per `(identity, token)`: the first admitted submission
    /// records and executes; any duplicate replays the stored outcome or
    /// reports InProgress while the original is still in flight.
    ///
    /// # Errors
    /// * `VerificationRequired` - The gate wants a verification first;
    ///   nothing was recorded
    /// * `InProgress` - An identical submission is still executing
    /// * `LedgerUnavailable` - No verdict from the ledger; the request
    ///   stays Recorded and a later identical submission will re-drive it
    pub async fn submit(&self, submission: TransferSubmission) -> DomainResult<TransferOutcome> {
        let now = Utc::now();
        let currency = submission
            .currency
            .clone()
            .unwrap_or_else(|| self.config.default_currency.clone());

        // Validation happens before anything durable exists
        let request = TransferRequest::recorded(
            submission.phone.clone(),
            submission.destination.clone(),
            submission.amount,
            currency,
            submission.concept.clone(),
            submission.idempotency_token.clone(),
        )?;

        // Step 1: the gate runs before the idempotency store is touched
        if self
            .gate
            .requires_challenge(&submission.phone, submission.amount, now)
            .await?
        {
            return Err(TransferError::VerificationRequired.into());
        }

        // Step 2: record before execute
        match self.transfers.record(&request).await? {
            RecordOutcome::Created => {
                self.audit
                    .record(
                        AuditRecord::new(AuditEventType::TransferRecorded, &request.phone)
                            .with_data(json!({
                                "token": request.idempotency_token,
                                "amount": request.amount.to_string(),
                                "currency": request.currency,
                            })),
                    )
                    .await;
                self.execute_recorded(request).await
            }
            RecordOutcome::Existing(existing) => self.resolve_existing(existing, now).await,
        }
    }

    /// Park a conversational transfer until its identity passes a challenge
    ///
    /// The parked row is invisible to the idempotency replay path until it
    /// is promoted; `find_oldest_awaiting` + [`Self::promote_and_execute`]
    /// drive it after verification succeeds.
    pub async fn park_pending(
        &self,
        submission: TransferSubmission,
    ) -> DomainResult<TransferRequest> {
        let currency = submission
            .currency
            .clone()
            .unwrap_or_else(|| self.config.default_currency.clone());
        let request = TransferRequest::awaiting_verification(
            submission.phone.clone(),
            submission.destination.clone(),
            submission.amount,
            currency,
            submission.concept.clone(),
            submission.idempotency_token.clone(),
        )?;

        match self.transfers.record(&request).await? {
            RecordOutcome::Created => Ok(request),
            // Same token already parked or settled; hand back the stored row
            RecordOutcome::Existing(existing) => Ok(existing),
        }
    }

    /// Promote the oldest parked transfer for an identity and execute it
    ///
    /// Called after a successful verification. Returns `Ok(None)` when
    /// nothing is parked. The promotion is a compare-and-set, so two
    /// concurrent confirmations drive at most one execution; the loser
    /// reports InProgress.
    pub async fn promote_and_execute(
        &self,
        phone: &PhoneNumber,
    ) -> DomainResult<Option<TransferOutcome>> {
        let parked = match self.transfers.find_oldest_awaiting(phone).await? {
            Some(parked) => parked,
            None => return Ok(None),
        };

        if !self.transfers.promote_to_recorded(parked.id).await? {
            return Err(TransferError::InProgress.into());
        }

        let mut request = parked;
        request.status = TransferStatus::Recorded;
        self.audit
            .record(
                AuditRecord::new(AuditEventType::TransferRecorded, phone)
                    .with_detail("promoted after verification")
                    .with_data(json!({ "token": request.idempotency_token })),
            )
            .await;

        self.execute_recorded(request).await.map(Some)
    }

    /// Balance pass-through to the ledger
    pub async fn balance(&self, phone: &PhoneNumber) -> DomainResult<BalanceInfo> {
        let info = self.ledger.balance(phone).await.map_err(|e| match e {
            LedgerError::Unavailable { .. } => DomainError::from(TransferError::LedgerUnavailable),
            LedgerError::Rejected { reason } => DomainError::BusinessRule { message: reason },
        })?;
        self.audit
            .record(AuditRecord::new(AuditEventType::BalanceQueried, phone))
            .await;
        Ok(info)
    }

    /// Resolve a duplicate submission against the stored row
    async fn resolve_existing(
        &self,
        existing: TransferRequest,
        now: DateTime<Utc>,
    ) -> DomainResult<TransferOutcome> {
        match existing.status {
            TransferStatus::Executed => {
                self.audit
                    .record(
                        AuditRecord::new(AuditEventType::TransferReplayed, &existing.phone)
                            .with_data(json!({ "token": existing.idempotency_token })),
                    )
                    .await;
                Ok(TransferOutcome::Executed {
                    request: existing,
                    replayed: true,
                })
            }
            TransferStatus::Rejected => {
                self.audit
                    .record(
                        AuditRecord::new(AuditEventType::TransferReplayed, &existing.phone)
                            .with_success(false)
                            .with_data(json!({ "token": existing.idempotency_token })),
                    )
                    .await;
                let reason = existing
                    .reject_reason
                    .clone()
                    .unwrap_or_else(|| "rejected".to_string());
                Ok(TransferOutcome::Rejected {
                    request: existing,
                    reason,
                    replayed: true,
                })
            }
            // The token exists but its verification never completed
            TransferStatus::RequiresVerification => Err(TransferError::VerificationRequired.into()),
            TransferStatus::Recorded => {
                // Either a concurrent duplicate or an abandoned execution.
                // Within the grace window the original caller is assumed
                // alive; past it the row is re-driven (the ledger dedups
                // on the token, so this cannot double-execute).
                let age = now - existing.created_at;
                if age > Duration::seconds(self.config.execution_grace_seconds) {
                    self.execute_recorded(existing).await
                } else {
                    Err(TransferError::InProgress.into())
                }
            }
        }
    }

    /// Run the ledger call for a row in `Recorded` state and finalize it
    async fn execute_recorded(&self, request: TransferRequest) -> DomainResult<TransferOutcome> {
        match self.ledger.execute_transfer(&request).await {
            Ok(receipt) => {
                let won = self
                    .transfers
                    .mark_executed(request.id, &receipt.reference, receipt.executed_at)
                    .await?;
                if !won {
                    // Another caller finalized first; report what it stored
                    return self.stored_outcome(&request).await;
                }
                self.audit
                    .record(
                        AuditRecord::new(AuditEventType::TransferExecuted, &request.phone)
                            .with_data(json!({
                                "token": request.idempotency_token,
                                "reference": receipt.reference,
                            })),
                    )
                    .await;
                let mut request = request;
                request.status = TransferStatus::Executed;
                request.outcome_ref = Some(receipt.reference);
                request.executed_at = Some(receipt.executed_at);
                Ok(TransferOutcome::Executed {
                    request,
                    replayed: false,
                })
            }
            Err(LedgerError::Rejected { reason }) => {
                let won = self.transfers.mark_rejected(request.id, &reason).await?;
                if !won {
                    return self.stored_outcome(&request).await;
                }
                self.audit
                    .record(
                        AuditRecord::new(AuditEventType::TransferRejected, &request.phone)
                            .with_success(false)
                            .with_detail(reason.as_str()),
                    )
                    .await;
                let mut request = request;
                request.status = TransferStatus::Rejected;
                request.reject_reason = Some(reason.clone());
                Ok(TransferOutcome::Rejected {
                    request,
                    reason,
                    replayed: false,
                })
            }
            // No verdict: the row stays Recorded so a later identical
            // submission can re-drive it once the grace window passes
            Err(LedgerError::Unavailable { .. }) => Err(TransferError::LedgerUnavailable.into()),
        }
    }

    /// Fetch the outcome another caller finalized for the same token
    async fn stored_outcome(&self, request: &TransferRequest) -> DomainResult<TransferOutcome> {
        let stored = self
            .transfers
            .find_by_token(&request.phone, &request.idempotency_token)
            .await?
            .ok_or_else(|| DomainError::Internal {
                message: "transfer row missing after finalize race".to_string(),
            })?;
        match stored.status {
            TransferStatus::Executed => Ok(TransferOutcome::Executed {
                request: stored,
                replayed: true,
            }),
            TransferStatus::Rejected => {
                let reason = stored
                    .reject_reason
                    .clone()
                    .unwrap_or_else(|| "rejected".to_string());
                Ok(TransferOutcome::Rejected {
                    request: stored,
                    reason,
                    replayed: true,
                })
            }
            _ => Err(TransferError::InProgress.into()),
        }
    }
}
