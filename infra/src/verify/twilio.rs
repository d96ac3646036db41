//! Twilio Verify v2 challenge provider
//!
//! Thin REST adapter over the Verify API: one endpoint starts a challenge,
//! one checks a submitted code. Twilio generates, delivers and stores the
//! one-time code; the only thing kept on our side is the verification SID.
//!
//! Error mapping follows the "no verdict" rule: transport failures, 5xx
//! and 429 become `ProviderError::Unavailable` so the orchestrator never
//! counts them against the caller. A 404 on the check endpoint means the
//! provider already closed the verification, which is an `Expired` verdict
//! rather than an error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use cb_core::domain::entities::verification_session::Channel;
use cb_core::services::verification::{
    ChallengeProvider, ProviderChallenge, ProviderCheckStatus, ProviderError,
};
use cb_shared::config::VerifyConfig;
use cb_shared::types::PhoneNumber;

use crate::InfrastructureError;

const VERIFY_API_BASE: &str = "https://verify.twilio.com/v2";

/// Request timeout; Verify calls are interactive, waiting longer than
/// this only stalls the conversation
const REQUEST_TIMEOUT_SECONDS: u64 = 10;

/// Twilio Verify v2 REST client
pub struct TwilioVerifyClient {
    http: reqwest::Client,
    account_sid: String,
    auth_token: String,
    service_sid: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct VerificationResponse {
    sid: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct VerificationCheckResponse {
    status: String,
}

impl TwilioVerifyClient {
    /// Build the client, validating that all credentials are present
    pub fn new(config: &VerifyConfig) -> Result<Self, InfrastructureError> {
        if !config.has_twilio_credentials() {
            return Err(InfrastructureError::Config(
                "Twilio verify mode requires TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN \
                 and TWILIO_VERIFY_SERVICE_SID"
                    .to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()?;

        Ok(Self {
            http,
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            service_sid: config.verify_service_sid.clone(),
            base_url: VERIFY_API_BASE.to_string(),
        })
    }

    async fn post_form(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<reqwest::Response, ProviderError> {
        self.http
            .post(url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(params)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))
    }
}

/// Map a Verify API verdict string onto ours
///
/// Twilio answers `pending` when the code did not match and the
/// verification stays open, which is our `Incorrect`.
fn map_check_status(status: &str) -> ProviderCheckStatus {
    match status {
        "approved" => ProviderCheckStatus::Approved,
        "canceled" | "expired" => ProviderCheckStatus::Expired,
        _ => ProviderCheckStatus::Incorrect,
    }
}

fn no_verdict(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

#[async_trait]
impl ChallengeProvider for TwilioVerifyClient {
    async fn start_challenge(
        &self,
        phone: &PhoneNumber,
        channel: Channel,
    ) -> Result<ProviderChallenge, ProviderError> {
        let url = format!("{}/Services/{}/Verifications", self.base_url, self.service_sid);
        // Twilio's channel names match ours (whatsapp, sms)
        let response = self
            .post_form(&url, &[("To", phone.as_e164()), ("Channel", channel.as_str())])
            .await?;

        let status = response.status();
        if no_verdict(status) {
            warn!(phone = %phone.masked(), %status, "Verify API unavailable on start");
            return Err(ProviderError::Unavailable(format!(
                "verify API answered {}",
                status
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(phone = %phone.masked(), %status, "Verify API refused challenge");
            return Err(ProviderError::Rejected(format!(
                "verify API answered {}: {}",
                status, body
            )));
        }

        let body: VerificationResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        debug!(
            phone = %phone.masked(),
            provider_ref = %body.sid,
            status = %body.status,
            "Challenge dispatched"
        );

        Ok(ProviderChallenge {
            provider_ref: body.sid,
        })
    }

    async fn check_code(
        &self,
        phone: &PhoneNumber,
        code: &str,
    ) -> Result<ProviderCheckStatus, ProviderError> {
        let url = format!(
            "{}/Services/{}/VerificationCheck",
            self.base_url, self.service_sid
        );
        let response = self
            .post_form(&url, &[("To", phone.as_e164()), ("Code", code)])
            .await?;

        let status = response.status();
        if no_verdict(status) {
            warn!(phone = %phone.masked(), %status, "Verify API unavailable on check");
            return Err(ProviderError::Unavailable(format!(
                "verify API answered {}",
                status
            )));
        }
        if status == StatusCode::NOT_FOUND {
            // No open verification on the provider side
            return Ok(ProviderCheckStatus::Expired);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Rejected(format!(
                "verify API answered {}: {}",
                status, body
            )));
        }

        let body: VerificationCheckResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        Ok(map_check_status(&body.status))
    }
}
