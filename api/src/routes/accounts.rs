//! Account balance endpoint

use actix_web::{web, HttpRequest, HttpResponse};

use cb_core::errors::ValidationError;
use cb_core::repositories::{
    AuditLogRepository, LockoutRepository, TransferRepository, VerificationSessionRepository,
};
use cb_core::services::transfer::LedgerExecutor;
use cb_core::services::verification::ChallengeProvider;
use cb_core::services::RateLimiterTrait;
use cb_shared::PhoneNumber;

use crate::app::AppState;
use crate::handlers::domain_error_response;

/// `GET /api/v1/accounts/{phone}/balance`
///
/// Ledger pass-through. The path accepts E.164 with the plus sign
/// URL-encoded (`%2B`) or bare digits with the default region applied.
pub async fn account_balance<P, SR, LR, RL, AR, TR, LX>(
    req: HttpRequest,
    state: web::Data<AppState<P, SR, LR, RL, AR, TR, LX>>,
    path: web::Path<String>,
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
    let raw_phone = path.into_inner();
    let phone = match PhoneNumber::parse(&raw_phone, &state.config.verify.default_country_code) {
        Ok(phone) => phone,
        Err(_) => {
            return domain_error_response(
                &req,
                &ValidationError::InvalidPhone { phone: raw_phone }.into(),
            )
        }
    };

    match state.transfers.balance(&phone).await {
        Ok(info) => HttpResponse::Ok().json(info),
        Err(error) => domain_error_response(&req, &error),
    }
}
