//! Application state and factory
//!
//! [`AppState`] wires the domain services behind their port traits so the
//! same app factory serves production (MySQL, Redis, Twilio) and tests
//! (in-memory fakes). [`create_app`] assembles routes and middleware; the
//! binary and the integration tests both build the app through it.

use std::collections::HashMap;
use std::sync::Arc;

use actix_web::body::MessageBody;
use actix_web::http::StatusCode;
use actix_web::{web, App, HttpResponse};
use chrono::Utc;
use tracing_actix_web::TracingLogger;

use cb_core::repositories::{
    AuditLogRepository, LockoutRepository, TransferRepository, VerificationSessionRepository,
};
use cb_core::services::transfer::{LedgerExecutor, TransferService};
use cb_core::services::verification::{ChallengeProvider, VerificationService};
use cb_core::services::{AuditService, RateLimiterTrait, RuleIntentParser, WebhookSignatureValidator};
use cb_shared::types::response::{HealthResponse, HealthStatus};
use cb_shared::{AppConfig, ErrorResponse};

use crate::dto::ErrorResponseExt;
use crate::handlers::error::error_codes;
use crate::middleware::{create_cors, SecurityHeaders};
use crate::routes;

/// Everything a request handler can reach
pub struct AppState<P, SR, LR, RL, AR, TR, LX>
where
    P: ChallengeProvider + 'static,
    SR: VerificationSessionRepository + 'static,
    LR: LockoutRepository + 'static,
    RL: RateLimiterTrait + 'static,
    AR: AuditLogRepository + 'static,
    TR: TransferRepository + 'static,
    LX: LedgerExecutor + 'static,
{
    pub verification: Arc<VerificationService<P, SR, LR, RL, AR>>,
    pub transfers: Arc<TransferService<TR, LX, SR, AR>>,

    /// Inbound-message admission, used directly by the webhook
    pub rate_limiter: Arc<RL>,

    /// Audit sink for events raised at the HTTP edge
    pub audit: AuditService<AR>,

    pub signature_validator: WebhookSignatureValidator,
    pub intent_parser: RuleIntentParser,
    pub config: AppConfig,
}

/// Create and configure the application with all dependencies
pub fn create_app<P, SR, LR, RL, AR, TR, LX>(
    app_state: web::Data<AppState<P, SR, LR, RL, AR, TR, LX>>,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
>
where
    P: ChallengeProvider + 'static,
    SR: VerificationSessionRepository + 'static,
    LR: LockoutRepository + 'static,
    RL: RateLimiterTrait + 'static,
    AR: AuditLogRepository + 'static,
    TR: TransferRepository + 'static,
    LX: LedgerExecutor + 'static,
{
    let cors = create_cors(&app_state.config.cors, &app_state.config.environment);
    let security = SecurityHeaders::new(&app_state.config.environment);

    App::new()
        .app_data(app_state)
        // Order matters: security runs first, then CORS, then access logging
        .wrap(TracingLogger::default())
        .wrap(cors)
        .wrap(security)
        .route("/health", web::get().to(health_check))
        .route(
            "/webhook/whatsapp",
            web::post().to(routes::webhook::whatsapp_webhook::<P, SR, LR, RL, AR, TR, LX>),
        )
        .service(
            web::scope("/api/v1")
                .service(
                    web::scope("/verify")
                        .route(
                            "/send",
                            web::post().to(routes::verify::send_challenge::<P, SR, LR, RL, AR, TR, LX>),
                        )
                        .route(
                            "/check",
                            web::post().to(routes::verify::check_code::<P, SR, LR, RL, AR, TR, LX>),
                        ),
                )
                .route(
                    "/transfers",
                    web::post().to(routes::transfers::create_transfer::<P, SR, LR, RL, AR, TR, LX>),
                )
                .route(
                    "/accounts/{phone}/balance",
                    web::get().to(routes::accounts::account_balance::<P, SR, LR, RL, AR, TR, LX>),
                )
                .route(
                    "/intent/parse",
                    web::post().to(routes::intent::parse_intent::<P, SR, LR, RL, AR, TR, LX>),
                )
                .route("/", web::get().to(api_index)),
        )
        .default_service(web::route().to(not_found))
}

/// Liveness endpoint for load balancers and uptime checks
async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: HealthStatus::Healthy,
        services: HashMap::new(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Compact index of the v1 surface
async fn api_index() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "service": "cartera-bot",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "verify_send": { "method": "POST", "path": "/api/v1/verify/send" },
            "verify_check": { "method": "POST", "path": "/api/v1/verify/check" },
            "transfers": { "method": "POST", "path": "/api/v1/transfers" },
            "balance": { "method": "GET", "path": "/api/v1/accounts/{phone}/balance" },
            "intent_parse": { "method": "POST", "path": "/api/v1/intent/parse" },
            "webhook": { "method": "POST", "path": "/webhook/whatsapp" },
            "health": { "method": "GET", "path": "/health" }
        }
    }))
}

async fn not_found() -> HttpResponse {
    ErrorResponse::new(
        error_codes::NOT_FOUND.to_string(),
        "Resource not found".to_string(),
    )
    .to_response(StatusCode::NOT_FOUND)
}
