//! Verification endpoint shapes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use cb_core::services::verification::{CheckOutcome, StartChallengeResult};

/// Body of `POST /api/v1/verify/send`
#[derive(Debug, Deserialize, Validate)]
pub struct SendChallengeRequest {
    /// Identity to challenge, E.164 or local digits
    #[validate(length(min = 8, max = 20, message = "phone must be 8-20 characters"))]
    pub phone: String,

    /// Delivery channel, `whatsapp` (default) or `sms`
    pub channel: Option<String>,
}

/// Body of `POST /api/v1/verify/check`
#[derive(Debug, Deserialize, Validate)]
pub struct CheckCodeRequest {
    #[validate(length(min = 8, max = 20, message = "phone must be 8-20 characters"))]
    pub phone: String,

    #[validate(length(min = 4, max = 8, message = "code must be 4-8 digits"))]
    pub code: String,
}

/// Response for a dispatched challenge
///
/// The provider reference stays server-side; callers only get the
/// session handle and its deadline.
#[derive(Debug, Serialize)]
pub struct SendChallengeResponse {
    pub session_ref: Uuid,
    pub status: String,
    pub expires_at: DateTime<Utc>,
    pub superseded_previous: bool,
}

impl From<StartChallengeResult> for SendChallengeResponse {
    fn from(result: StartChallengeResult) -> Self {
        Self {
            session_ref: result.session_id,
            status: "pending".to_string(),
            expires_at: result.expires_at,
            superseded_previous: result.superseded_previous,
        }
    }
}

/// Response for a code check
#[derive(Debug, Serialize)]
pub struct CheckCodeResponse {
    /// `approved`, `denied`, or `pending` when attempts remain
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_attempts: Option<u32>,
}

impl From<CheckOutcome> for CheckCodeResponse {
    fn from(outcome: CheckOutcome) -> Self {
        match outcome {
            CheckOutcome::Approved => Self {
                status: "approved".to_string(),
                remaining_attempts: None,
            },
            CheckOutcome::Denied => Self {
                status: "denied".to_string(),
                remaining_attempts: None,
            },
            CheckOutcome::Retry { remaining_attempts } => Self {
                status: "pending".to_string(),
                remaining_attempts: Some(remaining_attempts),
            },
        }
    }
}
