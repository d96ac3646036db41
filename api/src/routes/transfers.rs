//! Transfer submission endpoint

use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;
use validator::Validate;

use cb_core::domain::entities::transfer_request::TransferRequest;
use cb_core::errors::{DomainError, TransferError, ValidationError};
use cb_core::repositories::{
    AuditLogRepository, LockoutRepository, TransferRepository, VerificationSessionRepository,
};
use cb_core::services::transfer::{LedgerExecutor, TransferOutcome, TransferSubmission};
use cb_core::services::verification::ChallengeProvider;
use cb_core::services::RateLimiterTrait;
use cb_shared::{ErrorResponse, PhoneNumber};

use crate::app::AppState;
use crate::dto::{CreateTransferRequest, ErrorResponseExt, TransferReceiptResponse};
use crate::handlers::error::{error_codes, localized_message};
use crate::handlers::{domain_error_response, validation_error_response, Language};

/// `POST /api/v1/transfers`
///
/// Exactly-once per `(phone, idempotency_token)`: the first submission
/// settles, resubmissions replay the stored outcome with `replayed: true`.
/// A ledger rejection is a settled outcome and maps to 422 both on first
/// submission and on replay.
pub async fn create_transfer<P, SR, LR, RL, AR, TR, LX>(
    req: HttpRequest,
    state: web::Data<AppState<P, SR, LR, RL, AR, TR, LX>>,
    body: web::Json<CreateTransferRequest>,
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

    let request_body = body.into_inner();
    let phone = match PhoneNumber::parse(
        &request_body.phone,
        &state.config.verify.default_country_code,
    ) {
        Ok(phone) => phone,
        Err(_) => {
            return domain_error_response(
                &req,
                &ValidationError::InvalidPhone {
                    phone: request_body.phone,
                }
                .into(),
            )
        }
    };

    let submission = TransferSubmission {
        phone,
        destination: request_body.destination,
        amount: request_body.amount,
        currency: request_body.currency,
        concept: request_body.concept,
        idempotency_token: request_body.idempotency_token,
    };

    match state.transfers.submit(submission).await {
        Ok(TransferOutcome::Executed { request, replayed }) => {
            HttpResponse::Ok().json(TransferReceiptResponse::executed(request, replayed))
        }
        Ok(TransferOutcome::Rejected {
            request,
            reason,
            replayed,
        }) => rejected_response(&req, request, reason, replayed),
        Err(error) => domain_error_response(&req, &error),
    }
}

fn rejected_response(
    req: &HttpRequest,
    request: TransferRequest,
    reason: String,
    replayed: bool,
) -> HttpResponse {
    let error = DomainError::from(TransferError::ExecutionRejected {
        reason: reason.clone(),
    });
    ErrorResponse::new(
        error_codes::TRANSFER_REJECTED.to_string(),
        localized_message(&error, Language::from_request(req)),
    )
    .with_detail("reason", json!(reason))
    .with_detail("replayed", json!(replayed))
    .with_detail("request_id", json!(request.id))
    .to_response(StatusCode::UNPROCESSABLE_ENTITY)
}
