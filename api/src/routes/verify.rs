//! Verification endpoints: challenge dispatch and code checking

use actix_web::{web, HttpRequest, HttpResponse};
use validator::Validate;

use cb_core::domain::entities::verification_session::Channel;
use cb_core::errors::{DomainError, ValidationError};
use cb_core::repositories::{
    AuditLogRepository, LockoutRepository, TransferRepository, VerificationSessionRepository,
};
use cb_core::services::transfer::LedgerExecutor;
use cb_core::services::verification::ChallengeProvider;
use cb_core::services::RateLimiterTrait;
use cb_shared::PhoneNumber;

use crate::app::AppState;
use crate::dto::{CheckCodeRequest, CheckCodeResponse, SendChallengeRequest, SendChallengeResponse};
use crate::handlers::{domain_error_response, validation_error_response};

/// `POST /api/v1/verify/send`
///
/// Dispatches a one-time code and opens a pending session, superseding
/// any previous pending session for the same identity.
pub async fn send_challenge<P, SR, LR, RL, AR, TR, LX>(
    req: HttpRequest,
    state: web::Data<AppState<P, SR, LR, RL, AR, TR, LX>>,
    body: web::Json<SendChallengeRequest>,
) -> HttpResponse
where
    P: ChallengeProvider + 'static,
    SR: VerificationSessionRepository + 'static,
    LR: LockoutRepository + 'static,
    RL: RateLimiterTrait + 'static,
    AR: AuditLogRepository + 'static,
    TR: TransferRepository + 'static,
    LX: LedgerExecutor + 'static,
{
    if let Err(errors) = body.validate() {
        return validation_error_response(&req, &errors);
    }

    let phone = match PhoneNumber::parse(&body.phone, &state.config.verify.default_country_code) {
        Ok(phone) => phone,
        Err(_) => {
            return domain_error_response(
                &req,
                &ValidationError::InvalidPhone {
                    phone: body.phone.clone(),
                }
                .into(),
            )
        }
    };

    let channel = match body.channel.as_deref() {
        None => Channel::Whatsapp,
        Some(raw) => match Channel::from_str(raw) {
            Some(channel) => channel,
            None => {
                return domain_error_response(
                    &req,
                    &DomainError::Validation {
                        message: format!("unknown channel: {}", raw),
                    },
                )
            }
        },
    };

    match state.verification.start_challenge(&phone, channel).await {
        Ok(result) => HttpResponse::Ok().json(SendChallengeResponse::from(result)),
        Err(error) => domain_error_response(&req, &error),
    }
}

/// `POST /api/v1/verify/check`
///
/// Checks a code against the pending session. Wrong codes are not HTTP
/// errors; they come back as a `pending` status with the remaining
/// attempt count.
pub async fn check_code<P, SR, LR, RL, AR, TR, LX>(
    req: HttpRequest,
    state: web::Data<AppState<P, SR, LR, RL, AR, TR, LX>>,
    body: web::Json<CheckCodeRequest>,
) -> HttpResponse
where
    P: ChallengeProvider + 'static,
    SR: VerificationSessionRepository + 'static,
    LR: LockoutRepository + 'static,
    RL: RateLimiterTrait + 'static,
    AR: AuditLogRepository + 'static,
    TR: TransferRepository + 'static,
    LX: LedgerExecutor + 'static,
{
    if let Err(errors) = body.validate() {
        return validation_error_response(&req, &errors);
    }

    let phone = match PhoneNumber::parse(&body.phone, &state.config.verify.default_country_code) {
        Ok(phone) => phone,
        Err(_) => {
            return domain_error_response(
                &req,
                &ValidationError::InvalidPhone {
                    phone: body.phone.clone(),
                }
                .into(),
            )
        }
    };

    match state.verification.check_response(&phone, &body.code).await {
        Ok(outcome) => HttpResponse::Ok().json(CheckCodeResponse::from(outcome)),
        Err(error) => domain_error_response(&req, &error),
    }
}
