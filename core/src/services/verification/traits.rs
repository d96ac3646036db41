//! Challenge provider abstraction
//!
//! The external verification provider (Twilio Verify in production, a fixed
//! code locally) dispatches one-time codes and judges submitted answers. The
//! orchestrator only ever sees this trait; it holds the opaque reference the
//! provider hands back and never the code itself.

use async_trait::async_trait;
use thiserror::Error;

use cb_shared::types::PhoneNumber;

use crate::domain::entities::verification_session::Channel;

/// Opaque handle returned when a challenge was dispatched
#[derive(Debug, Clone)]
pub struct ProviderChallenge {
    /// Provider-side identifier for the challenge (e.g. a Twilio SID)
    pub provider_ref: String,
}

/// The provider's verdict on a submitted code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderCheckStatus {
    /// The code matched
    Approved,
    /// The code did not match; the challenge is still open
    Incorrect,
    /// The provider no longer holds an open challenge for this identity
    Expired,
}

/// Errors at the provider boundary
///
/// Both variants mean "no verdict": the orchestrator maps them to
/// ProviderUnavailable and consumes no attempt. The split only exists so
/// adapters can log transport trouble and API-level refusals differently.
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Transport failure, timeout, or a 5xx from the provider
    #[error("verification provider unavailable: {0}")]
    Unavailable(String),

    /// The provider actively refused the request (4xx)
    #[error("verification provider rejected the request: {0}")]
    Rejected(String),
}

/// External verification provider
#[async_trait]
pub trait ChallengeProvider: Send + Sync {
    /// Dispatch a one-time code to the phone over the given channel
    async fn start_challenge(
        &self,
        phone: &PhoneNumber,
        channel: Channel,
    ) -> Result<ProviderChallenge, ProviderError>;

    /// Ask the provider whether a submitted code matches the open challenge
    async fn check_code(
        &self,
        phone: &PhoneNumber,
        code: &str,
    ) -> Result<ProviderCheckStatus, ProviderError>;
}
