//! WhatsApp webhook: signed form-encoded messages in, TwiML out
//!
//! Every reply is HTTP 200 with a Spanish TwiML body; the only non-200 is
//! the 403 for a bad signature, which runs before anything else. Internal
//! error detail never reaches the chat.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use uuid::Uuid;

use cb_core::domain::entities::audit::{AuditEventType, AuditRecord};
use cb_core::domain::entities::verification_session::Channel;
use cb_core::errors::{DomainError, TransferError, VerificationError};
use cb_core::repositories::{
    AuditLogRepository, LockoutRepository, TransferRepository, VerificationSessionRepository,
};
use cb_core::services::transfer::{LedgerExecutor, TransferOutcome, TransferSubmission};
use cb_core::services::verification::{ChallengeProvider, CheckOutcome};
use cb_core::services::{
    extract_confirmation_code, Intent, IntentParser, OperationClass, RateLimitDecision,
    RateLimiterTrait,
};
use cb_shared::PhoneNumber;

use crate::app::AppState;
use crate::handlers::domain_error_response;
use crate::twiml;

/// Header carrying the gateway's HMAC-SHA256 tag
pub const SIGNATURE_HEADER: &str = "X-Cartera-Signature";

const HELP_REPLY: &str = "Hola 👋 Puedo ayudarte con:\n\
• \"saldo\" para consultar tu saldo\n\
• \"transferir <monto> a <cuenta>\" para enviar dinero\n\
• \"CONFIRMAR <código>\" para confirmar una operación pendiente";

const GENERIC_ERROR_REPLY: &str = "Ocurrió un error procesando tu mensaje. Intenta más tarde.";

/// `POST /webhook/whatsapp`
pub async fn whatsapp_webhook<P, SR, LR, RL, AR, TR, LX>(
    req: HttpRequest,
    state: web::Data<AppState<P, SR, LR, RL, AR, TR, LX>>,
    form: web::Form<Vec<(String, String)>>,
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
    let params = form.into_inner();

    // Signature first: an unauthenticated request runs nothing else.
    // The gateway signs the public URL it called, not our internal one.
    let url = state.config.webhook.public_url(req.path());
    let provided = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    if !state
        .signature_validator
        .validate(&url, &params, provided)
        .is_valid()
    {
        state
            .audit
            .record(
                AuditRecord::anonymous(AuditEventType::SignatureRejected)
                    .with_success(false)
                    .with_detail(req.path().to_string()),
            )
            .await;
        return domain_error_response(&req, &VerificationError::AuthenticationFailed.into());
    }

    let Some(from) = param(&params, "From") else {
        tracing::warn!("webhook payload without From field");
        return HttpResponse::Ok()
            .content_type("application/xml; charset=utf-8")
            .body(twiml::empty());
    };
    let body_text = param(&params, "Body").unwrap_or_default();

    let phone = match PhoneNumber::from_whatsapp(from, &state.config.verify.default_country_code) {
        Ok(phone) => phone,
        Err(_) => {
            tracing::warn!("webhook sender address could not be canonicalized");
            return HttpResponse::Ok()
                .content_type("application/xml; charset=utf-8")
                .body(twiml::empty());
        }
    };

    // Per-sender inbound budget
    match state
        .rate_limiter
        .admit(&phone, OperationClass::InboundMessage, Utc::now())
        .await
    {
        Ok(RateLimitDecision::Admitted) => {}
        Ok(RateLimitDecision::Throttled {
            retry_after_seconds,
        }) => {
            state
                .audit
                .record(
                    AuditRecord::new(AuditEventType::RateLimitExceeded, &phone)
                        .with_success(false)
                        .with_detail(OperationClass::InboundMessage.as_str()),
                )
                .await;
            return twiml::reply(&format!(
                "Demasiados mensajes. Intenta de nuevo en {} segundos.",
                retry_after_seconds
            ));
        }
        Err(error) => {
            tracing::error!(error = %error, phone = %phone.masked(), "inbound admission failed");
            return twiml::reply(GENERIC_ERROR_REPLY);
        }
    }

    // "CONFIRMAR 123456" answers the open challenge
    if let Some(code) = extract_confirmation_code(body_text) {
        return confirmation_reply(&state, &phone, &code).await;
    }

    let parsed = state.intent_parser.parse(body_text);
    tracing::debug!(
        phone = %phone.masked(),
        intent = parsed.intent.canonical_name(),
        confidence = parsed.confidence,
        "webhook intent parsed"
    );

    match parsed.intent {
        Intent::BalanceQuery => balance_reply(&state, &phone).await,
        Intent::Transfer {
            amount: Some(amount),
            destination: Some(destination),
        } => transfer_reply(&state, &phone, amount, destination).await,
        Intent::Transfer { .. } => twiml::reply(
            "Para transferir indica el monto y la cuenta destino, por ejemplo:\n\
             transferir 500 a 002010077777777771",
        ),
        Intent::Unknown => twiml::reply(HELP_REPLY),
    }
}

async fn confirmation_reply<P, SR, LR, RL, AR, TR, LX>(
    state: &AppState<P, SR, LR, RL, AR, TR, LX>,
    phone: &PhoneNumber,
    code: &str,
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
    match state.verification.check_response(phone, code).await {
        Ok(CheckOutcome::Approved) => match state.transfers.promote_and_execute(phone).await {
            Ok(Some(TransferOutcome::Executed { request, .. })) => twiml::reply(&format!(
                "✅ Transferencia de ${} {} ejecutada. Folio: {}.",
                request.amount,
                request.currency,
                request.outcome_ref.as_deref().unwrap_or("s/n")
            )),
            Ok(Some(TransferOutcome::Rejected { reason, .. })) => {
                twiml::reply(&rejected_reply(&reason))
            }
            Ok(None) => twiml::reply(
                "✅ Verificación exitosa. Ya puedes consultar tu saldo o transferir.",
            ),
            Err(error) => twiml::reply(&spanish_reply(&error)),
        },
        Ok(CheckOutcome::Retry { remaining_attempts }) => {
            let reply = if remaining_attempts == 1 {
                "Código incorrecto. Te queda 1 intento.".to_string()
            } else {
                format!(
                    "Código incorrecto. Te quedan {} intentos.",
                    remaining_attempts
                )
            };
            twiml::reply(&reply)
        }
        Ok(CheckOutcome::Denied) => {
            twiml::reply("Verificación rechazada. Envía tu solicitud de nuevo para otro código.")
        }
        Err(error) => twiml::reply(&spanish_reply(&error)),
    }
}

async fn balance_reply<P, SR, LR, RL, AR, TR, LX>(
    state: &AppState<P, SR, LR, RL, AR, TR, LX>,
    phone: &PhoneNumber,
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
    let has_approval = match state
        .transfers
        .gate()
        .has_recent_approval(phone, Utc::now())
        .await
    {
        Ok(has_approval) => has_approval,
        Err(error) => return twiml::reply(&spanish_reply(&error)),
    };

    if !has_approval {
        return match state
            .verification
            .start_challenge(phone, Channel::Whatsapp)
            .await
        {
            Ok(_) => twiml::reply(
                "Por seguridad te enviamos un código de verificación. \
                 Responde CONFIRMAR <código> y vuelve a pedir tu saldo.",
            ),
            Err(error) => twiml::reply(&spanish_reply(&error)),
        };
    }

    match state.transfers.balance(phone).await {
        Ok(info) => twiml::reply(&format!("Tu saldo es ${} {}.", info.balance, info.currency)),
        Err(error) => twiml::reply(&spanish_reply(&error)),
    }
}

async fn transfer_reply<P, SR, LR, RL, AR, TR, LX>(
    state: &AppState<P, SR, LR, RL, AR, TR, LX>,
    phone: &PhoneNumber,
    amount: rust_decimal::Decimal,
    destination: String,
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
    // Chat has no client token, so each message gets a fresh one; dedup
    // across messages is the parked-row promotion, not the token.
    let submission = TransferSubmission {
        phone: phone.clone(),
        destination,
        amount,
        currency: None,
        concept: None,
        idempotency_token: format!("wa-{}", Uuid::new_v4()),
    };

    let needs_challenge = match state
        .transfers
        .gate()
        .requires_challenge(phone, amount, Utc::now())
        .await
    {
        Ok(needs_challenge) => needs_challenge,
        Err(error) => return twiml::reply(&spanish_reply(&error)),
    };

    if needs_challenge {
        let parked = match state.transfers.park_pending(submission).await {
            Ok(parked) => parked,
            Err(error) => return twiml::reply(&spanish_reply(&error)),
        };
        return match state
            .verification
            .start_challenge(phone, Channel::Whatsapp)
            .await
        {
            Ok(_) => twiml::reply(&format!(
                "Por seguridad te enviamos un código. Responde CONFIRMAR <código> \
                 para ejecutar la transferencia de ${} {}.",
                parked.amount, parked.currency
            )),
            Err(error) => twiml::reply(&spanish_reply(&error)),
        };
    }

    match state.transfers.submit(submission).await {
        Ok(TransferOutcome::Executed { request, .. }) => twiml::reply(&format!(
            "✅ Transferencia de ${} {} ejecutada. Folio: {}.",
            request.amount,
            request.currency,
            request.outcome_ref.as_deref().unwrap_or("s/n")
        )),
        Ok(TransferOutcome::Rejected { reason, .. }) => twiml::reply(&rejected_reply(&reason)),
        Err(error) => twiml::reply(&spanish_reply(&error)),
    }
}

fn param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

fn rejected_reply(reason: &str) -> String {
    if reason.contains("insufficient") {
        "❌ Fondos insuficientes para completar la transferencia.".to_string()
    } else {
        "❌ La transferencia fue rechazada por el banco.".to_string()
    }
}

/// Chat rendering of domain refusals, short and free of internals
fn spanish_reply(error: &DomainError) -> String {
    match error {
        DomainError::Verification(e) => match e {
            VerificationError::RateLimited {
                retry_after_seconds,
            } => format!(
                "Demasiadas solicitudes. Intenta de nuevo en {} segundos.",
                retry_after_seconds
            ),
            VerificationError::Locked {
                retry_after_seconds,
            } => {
                let minutes = (retry_after_seconds + 59) / 60;
                format!(
                    "Demasiados intentos fallidos. Espera {} minutos e intenta de nuevo.",
                    minutes
                )
            }
            VerificationError::ProviderUnavailable => {
                "El servicio de verificación no está disponible. Intenta más tarde.".to_string()
            }
            VerificationError::SessionExpired => {
                "El código expiró. Envía tu solicitud de nuevo para recibir otro.".to_string()
            }
            VerificationError::SessionNotPending => {
                "No hay ninguna verificación pendiente. Envía tu solicitud primero.".to_string()
            }
            VerificationError::AuthenticationFailed => GENERIC_ERROR_REPLY.to_string(),
        },
        DomainError::Transfer(e) => match e {
            TransferError::InProgress => {
                "Tu transferencia ya está en proceso. Espera un momento.".to_string()
            }
            TransferError::LedgerUnavailable => {
                "El servicio bancario no está disponible. Tu solicitud no se perdió; \
                 intenta de nuevo en unos minutos."
                    .to_string()
            }
            TransferError::VerificationRequired => {
                "Esta operación requiere verificación. Envía tu solicitud de nuevo.".to_string()
            }
            TransferError::ExecutionRejected { reason } => rejected_reply(reason),
        },
        DomainError::Validation { .. } | DomainError::ValidationErr(_) => {
            "No pude entender los datos de tu solicitud. Revisa el formato e intenta de nuevo."
                .to_string()
        }
        _ => GENERIC_ERROR_REPLY.to_string(),
    }
}
