//! Mock challenge provider for development and tests
//!
//! Accepts exactly one configured code and never leaves the process. The
//! code is printed to the log at startup by the bootstrap, not here, so a
//! noisy handler cannot leak it on every request.

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use cb_core::domain::entities::verification_session::Channel;
use cb_core::services::verification::{
    ChallengeProvider, ProviderChallenge, ProviderCheckStatus, ProviderError,
};
use cb_shared::types::PhoneNumber;

/// Provider that accepts a single fixed code
pub struct MockVerifyClient {
    accept_code: String,
}

impl MockVerifyClient {
    pub fn new(accept_code: impl Into<String>) -> Self {
        Self {
            accept_code: accept_code.into(),
        }
    }
}

#[async_trait]
impl ChallengeProvider for MockVerifyClient {
    async fn start_challenge(
        &self,
        phone: &PhoneNumber,
        channel: Channel,
    ) -> Result<ProviderChallenge, ProviderError> {
        let provider_ref = format!("mock-{}", Uuid::new_v4());

        info!(
            phone = %phone.masked(),
            channel = channel.as_str(),
            provider_ref = %provider_ref,
            "Mock challenge dispatched"
        );

        Ok(ProviderChallenge { provider_ref })
    }

    async fn check_code(
        &self,
        _phone: &PhoneNumber,
        code: &str,
    ) -> Result<ProviderCheckStatus, ProviderError> {
        if code == self.accept_code {
            Ok(ProviderCheckStatus::Approved)
        } else {
            Ok(ProviderCheckStatus::Incorrect)
        }
    }
}
