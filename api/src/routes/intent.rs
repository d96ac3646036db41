//! Intent parsing endpoint, useful for tuning the rule set

use actix_web::{web, HttpRequest, HttpResponse};
use validator::Validate;

use cb_core::repositories::{
    AuditLogRepository, LockoutRepository, TransferRepository, VerificationSessionRepository,
};
use cb_core::services::transfer::LedgerExecutor;
use cb_core::services::verification::ChallengeProvider;
use cb_core::services::{IntentParser, RateLimiterTrait};

use crate::app::AppState;
use crate::dto::ParseIntentRequest;
use crate::handlers::validation_error_response;

/// `POST /api/v1/intent/parse`
pub async fn parse_intent<P, SR, LR, RL, AR, TR, LX>(
    req: HttpRequest,
    state: web::Data<AppState<P, SR, LR, RL, AR, TR, LX>>,
    body: web::Json<ParseIntentRequest>,
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

    let parsed = state.intent_parser.parse(&body.text);
    HttpResponse::Ok().json(parsed)
}
