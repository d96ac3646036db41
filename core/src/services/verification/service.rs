//! Verification orchestrator
//!
//! Drives the session state machine `Pending → Approved | Denied | Expired`
//! around the external challenge provider:
//!
//! - `start_challenge`: rate limit → lockout check → provider dispatch →
//!   pending session (superseding any prior one) → audit
//! - `check_response`: rate limit → lockout check → lazy expiry → provider
//!   verdict → state transition + lockout bookkeeping → audit
//!
//! All session transitions go through the repository's compare-and-set
//! operations, so two concurrent checks for the same identity cannot both
//! settle the session. Provider trouble is surfaced as ProviderUnavailable
//! and never consumes an attempt or counts toward the lockout.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

use cb_shared::types::PhoneNumber;

use crate::domain::entities::audit::{AuditEventType, AuditRecord};
use crate::domain::entities::verification_session::{Channel, SessionStatus, VerificationSession};
use crate::errors::{DomainResult, VerificationError};
use crate::repositories::{AuditLogRepository, LockoutRepository, VerificationSessionRepository};
use crate::services::audit::AuditService;
use crate::services::lockout::LockoutTracker;
use crate::services::rate_limit::{OperationClass, RateLimitDecision, RateLimiterTrait};
use crate::services::verification::config::VerificationConfig;
use crate::services::verification::traits::{ChallengeProvider, ProviderCheckStatus};
use crate::services::verification::types::{CheckOutcome, StartChallengeResult};

/// Orchestrates challenge dispatch and code checking for one identity at a time
pub struct VerificationService<P, S, L, R, A>
where
    P: ChallengeProvider,
    S: VerificationSessionRepository,
    L: LockoutRepository,
    R: RateLimiterTrait,
    A: AuditLogRepository + 'static,
{
    provider: Arc<P>,
    sessions: Arc<S>,
    lockout: LockoutTracker<L>,
    rate_limiter: Arc<R>,
    audit: AuditService<A>,
    config: VerificationConfig,
}

impl<P, S, L, R, A> VerificationService<P, S, L, R, A>
where
    P: ChallengeProvider,
    S: VerificationSessionRepository,
    L: LockoutRepository,
    R: RateLimiterTrait,
    A: AuditLogRepository + 'static,
{
    /// Create a new verification service
    pub fn new(
        provider: Arc<P>,
        sessions: Arc<S>,
        lockout: LockoutTracker<L>,
        rate_limiter: Arc<R>,
        audit: AuditService<A>,
        config: VerificationConfig,
    ) -> Self {
        Self {
            provider,
            sessions,
            lockout,
            rate_limiter,
            audit,
            config,
        }
    }

    /// Dispatch a challenge and open a pending session for the identity
    ///
    /// Any prior pending session for the same identity is expired in the
    /// same operation (a resend supersedes, it does not stack). When the
    /// provider call fails no session is created at all.
    ///
    /// # Arguments
    /// * `phone` - Canonical identity to challenge
    /// * `channel` - Delivery channel for the one-time code
    ///
    /// # Errors
    /// * `RateLimited` - Send budget for this identity is exhausted
    /// * `Locked` - Identity is under a failure lockout
    /// * `ProviderUnavailable` - The provider call failed; nothing was created
    pub async fn start_challenge(
        &self,
        phone: &PhoneNumber,
        channel: Channel,
    ) -> DomainResult<StartChallengeResult> {
        let now = Utc::now();

        // Step 1: rate limit for the verify-send class
        if let RateLimitDecision::Throttled {
            retry_after_seconds,
        } = self
            .rate_limiter
            .admit(phone, OperationClass::VerifySend, now)
            .await?
        {
            self.audit
                .record(
                    AuditRecord::new(AuditEventType::RateLimitExceeded, phone)
                        .with_success(false)
                        .with_detail(OperationClass::VerifySend.as_str()),
                )
                .await;
            return Err(VerificationError::RateLimited {
                retry_after_seconds,
            }
            .into());
        }

        // Step 2: refuse before the external call when locked
        if let Some(retry_after_seconds) = self.lockout.is_locked(phone, now).await? {
            return Err(VerificationError::Locked {
                retry_after_seconds,
            }
            .into());
        }

        // Step 3: dispatch through the provider
        let challenge = match self.provider.start_challenge(phone, channel).await {
            Ok(challenge) => challenge,
            Err(e) => {
                self.audit
                    .record(
                        AuditRecord::new(AuditEventType::ChallengeFailed, phone)
                            .with_success(false)
                            .with_detail(e.to_string()),
                    )
                    .await;
                return Err(VerificationError::ProviderUnavailable.into());
            }
        };

        // Step 4: persist the pending session, expiring any prior one
        let session = VerificationSession::new(
            phone.clone(),
            challenge.provider_ref,
            channel,
            self.config.session_ttl_minutes,
        );
        let superseded = self.sessions.insert_superseding(&session).await?;

        // Step 5: audit the dispatch
        self.audit
            .record(
                AuditRecord::new(AuditEventType::ChallengeSent, phone).with_data(json!({
                    "session_id": session.id,
                    "channel": channel.as_str(),
                    "superseded": superseded,
                })),
            )
            .await;

        Ok(StartChallengeResult {
            session_id: session.id,
            provider_ref: session.provider_ref,
            expires_at: session.expires_at,
            superseded_previous: superseded > 0,
        })
    }

    /// Check a submitted code against the identity's pending session
    ///
    /// Session expiry is evaluated lazily here; an expired session is moved
    /// to Expired and the submission consumes no attempt. A provider outage
    /// likewise consumes nothing. Only a provider-confirmed mismatch counts:
    /// it increments the session attempt counter and the consecutive-failure
    /// lockout counter.
    ///
    /// # Arguments
    /// * `phone` - Canonical identity answering the challenge
    /// * `code` - The submitted one-time code
    ///
    /// # Returns
    /// * `CheckOutcome::Approved` - Code matched, session settled as Approved
    /// * `CheckOutcome::Denied` - Attempts exhausted, session settled as Denied
    /// * `CheckOutcome::Retry` - Wrong code, session still open
    ///
    /// # Errors
    /// * `RateLimited` - Check budget for this identity is exhausted
    /// * `Locked` - Identity is (or just became) locked out
    /// * `SessionNotPending` - No open session, or it settled concurrently
    /// * `SessionExpired` - The session lapsed before this submission
    /// * `ProviderUnavailable` - No verdict; nothing was consumed
    pub async fn check_response(
        &self,
        phone: &PhoneNumber,
        code: &str,
    ) -> DomainResult<CheckOutcome> {
        let now = Utc::now();

        // Step 1: rate limit for the verify-check class
        if let RateLimitDecision::Throttled {
            retry_after_seconds,
        } = self
            .rate_limiter
            .admit(phone, OperationClass::VerifyCheck, now)
            .await?
        {
            self.audit
                .record(
                    AuditRecord::new(AuditEventType::RateLimitExceeded, phone)
                        .with_success(false)
                        .with_detail(OperationClass::VerifyCheck.as_str()),
                )
                .await;
            return Err(VerificationError::RateLimited {
                retry_after_seconds,
            }
            .into());
        }

        // Step 2: a locked identity gets no verdict at all
        if let Some(retry_after_seconds) = self.lockout.is_locked(phone, now).await? {
            return Err(VerificationError::Locked {
                retry_after_seconds,
            }
            .into());
        }

        // Step 3: there must be an open session
        let session = self
            .sessions
            .find_pending(phone)
            .await?
            .ok_or(VerificationError::SessionNotPending)?;

        // Step 4: lazy expiry, before the provider is consulted
        if session.is_expired(now) {
            self.sessions
                .transition_from_pending(session.id, SessionStatus::Expired)
                .await?;
            self.audit
                .record(
                    AuditRecord::new(AuditEventType::VerificationExpired, phone)
                        .with_success(false),
                )
                .await;
            return Err(VerificationError::SessionExpired.into());
        }

        // Step 5: ask the provider for a verdict
        let status = match self.provider.check_code(phone, code).await {
            Ok(status) => status,
            Err(e) => {
                self.audit
                    .record(
                        AuditRecord::new(AuditEventType::ChallengeFailed, phone)
                            .with_success(false)
                            .with_detail(e.to_string()),
                    )
                    .await;
                return Err(VerificationError::ProviderUnavailable.into());
            }
        };

        match status {
            // The provider's own window closed before ours did
            ProviderCheckStatus::Expired => {
                self.sessions
                    .transition_from_pending(session.id, SessionStatus::Expired)
                    .await?;
                self.audit
                    .record(
                        AuditRecord::new(AuditEventType::VerificationExpired, phone)
                            .with_success(false),
                    )
                    .await;
                Err(VerificationError::SessionExpired.into())
            }

            ProviderCheckStatus::Approved => {
                // CAS: a concurrent check may have settled the session first
                if !self
                    .sessions
                    .transition_from_pending(session.id, SessionStatus::Approved)
                    .await?
                {
                    return Err(VerificationError::SessionNotPending.into());
                }
                self.lockout.record_success(phone, now).await?;
                self.audit
                    .record(AuditRecord::new(AuditEventType::VerificationApproved, phone))
                    .await;
                Ok(CheckOutcome::Approved)
            }

            ProviderCheckStatus::Incorrect => self.handle_incorrect_code(phone, &session).await,
        }
    }

    /// Count a provider-confirmed mismatch against the session and the lockout
    async fn handle_incorrect_code(
        &self,
        phone: &PhoneNumber,
        session: &VerificationSession,
    ) -> DomainResult<CheckOutcome> {
        let now = Utc::now();

        // Atomic increment; None means a concurrent call already settled it
        let attempts = self
            .sessions
            .increment_attempts(session.id)
            .await?
            .ok_or(VerificationError::SessionNotPending)?;

        // Every wrong code counts toward the cross-session lockout
        let lockout_state = self.lockout.record_failure(phone, now).await?;
        let lock_tripped = lockout_state.is_locked(now);
        if lock_tripped {
            self.audit
                .record(
                    AuditRecord::new(AuditEventType::LockoutTriggered, phone)
                        .with_success(false)
                        .with_data(json!({
                            "failed_attempts": lockout_state.failed_attempts,
                        })),
                )
                .await;
        }

        if attempts >= self.config.max_session_attempts {
            // Out of attempts: the session settles as Denied
            self.sessions
                .transition_from_pending(session.id, SessionStatus::Denied)
                .await?;
            self.audit
                .record(
                    AuditRecord::new(AuditEventType::VerificationDenied, phone)
                        .with_success(false)
                        .with_data(json!({ "attempts": attempts })),
                )
                .await;
            return Ok(CheckOutcome::Denied);
        }

        if lock_tripped {
            // The session stays open, but the identity is refused until the
            // cooldown passes; a truthful error beats an unusable retry hint
            return Err(VerificationError::Locked {
                retry_after_seconds: lockout_state.remaining_lock_seconds(now),
            }
            .into());
        }

        self.audit
            .record(
                AuditRecord::new(AuditEventType::ChallengeFailed, phone)
                    .with_success(false)
                    .with_detail("incorrect code"),
            )
            .await;
        Ok(CheckOutcome::Retry {
            remaining_attempts: self.config.max_session_attempts - attempts,
        })
    }
}
