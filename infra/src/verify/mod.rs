//! Challenge provider backends
//!
//! The backend is chosen once at startup from typed configuration; from
//! then on call sites hold the closed `VerifyBackend` enum and never
//! dispatch on a provider name string.

pub mod mock;
pub mod twilio;

pub use mock::MockVerifyClient;
pub use twilio::TwilioVerifyClient;

use async_trait::async_trait;
use tracing::{info, warn};

use cb_core::domain::entities::verification_session::Channel;
use cb_core::services::verification::{
    ChallengeProvider, ProviderChallenge, ProviderCheckStatus, ProviderError,
};
use cb_shared::config::{VerifyConfig, VerifyMode};
use cb_shared::types::PhoneNumber;

use crate::InfrastructureError;

/// Challenge provider selected at construction
pub enum VerifyBackend {
    Twilio(TwilioVerifyClient),
    Mock(MockVerifyClient),
}

impl VerifyBackend {
    /// Build the backend the configuration names
    ///
    /// Twilio mode fails fast on missing credentials instead of failing
    /// on the first challenge.
    pub fn from_config(config: &VerifyConfig) -> Result<Self, InfrastructureError> {
        match config.mode {
            VerifyMode::Twilio => {
                let client = TwilioVerifyClient::new(config)?;
                info!("Verification backend: Twilio Verify");
                Ok(VerifyBackend::Twilio(client))
            }
            VerifyMode::Mock => {
                warn!("Verification backend: mock provider, codes are not real");
                Ok(VerifyBackend::Mock(MockVerifyClient::new(
                    config.mock_accept_code.clone(),
                )))
            }
        }
    }
}

#[async_trait]
impl ChallengeProvider for VerifyBackend {
    async fn start_challenge(
        &self,
        phone: &PhoneNumber,
        channel: Channel,
    ) -> Result<ProviderChallenge, ProviderError> {
        match self {
            VerifyBackend::Twilio(client) => client.start_challenge(phone, channel).await,
            VerifyBackend::Mock(client) => client.start_challenge(phone, channel).await,
        }
    }

    async fn check_code(
        &self,
        phone: &PhoneNumber,
        code: &str,
    ) -> Result<ProviderCheckStatus, ProviderError> {
        match self {
            VerifyBackend::Twilio(client) => client.check_code(phone, code).await,
            VerifyBackend::Mock(client) => client.check_code(phone, code).await,
        }
    }
}
