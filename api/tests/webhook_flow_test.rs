//! End-to-end tests for the WhatsApp webhook: signature checking, intent
//! handling and the park-confirm-execute conversation flow.

mod support;

use actix_web::test;
use rust_decimal::Decimal;

use cb_api::app::create_app;
use cb_api::routes::webhook::SIGNATURE_HEADER;
use cb_core::domain::entities::audit::AuditEventType;
use cb_core::domain::entities::transfer_request::TransferStatus;
use cb_core::domain::entities::verification_session::SessionStatus;
use cb_shared::config::WindowLimit;
use cb_shared::RateLimitConfig;

use support::{form, harness, harness_with_rate_limit, sign_form, ACCEPT_CODE};

const SENDER: &str = "whatsapp:+525511223344";
const WEBHOOK_PATH: &str = "/webhook/whatsapp";
const ACCOUNT: &str = "002010077777777771";

async fn send_signed<S, B>(app: &S, state: &support::TestState, body: &str) -> String
where
    S: actix_web::dev::Service<
        actix_http::Request,
        Response = actix_web::dev::ServiceResponse<B>,
        Error = actix_web::Error,
    >,
    B: actix_web::body::MessageBody,
{
    let params = form(SENDER, body);
    let signature = sign_form(state, WEBHOOK_PATH, &params);
    let req = test::TestRequest::post()
        .uri(WEBHOOK_PATH)
        .insert_header((SIGNATURE_HEADER, signature))
        .set_form(&params)
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), 200);
    let bytes = test::read_body(resp).await;
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[actix_web::test]
async fn test_unsigned_webhook_is_rejected() {
    let h = harness();
    let app = test::init_service(create_app(h.state.clone())).await;

    let req = test::TestRequest::post()
        .uri(WEBHOOK_PATH)
        .set_form(&form(SENDER, "saldo"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 403);
    assert_eq!(h.audit.count_of(AuditEventType::SignatureRejected), 1);
    // Nothing else ran
    assert!(h.sessions.get_all().is_empty());
}

#[actix_web::test]
async fn test_tampered_body_fails_signature() {
    let h = harness();
    let app = test::init_service(create_app(h.state.clone())).await;

    // Sign one body, send another
    let signature = sign_form(h.state.get_ref(), WEBHOOK_PATH, &form(SENDER, "saldo"));
    let req = test::TestRequest::post()
        .uri(WEBHOOK_PATH)
        .insert_header((SIGNATURE_HEADER, signature))
        .set_form(&form(SENDER, "transferir 99999 a 002010077777777771"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 403);
    assert_eq!(h.audit.count_of(AuditEventType::SignatureRejected), 1);
}

#[actix_web::test]
async fn test_missing_from_field_is_acknowledged_with_empty_twiml() {
    let h = harness();
    let app = test::init_service(create_app(h.state.clone())).await;

    let params = vec![("Body".to_string(), "saldo".to_string())];
    let signature = sign_form(h.state.get_ref(), WEBHOOK_PATH, &params);
    let req = test::TestRequest::post()
        .uri(WEBHOOK_PATH)
        .insert_header((SIGNATURE_HEADER, signature))
        .set_form(&params)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("<Response></Response>"));
    assert!(!body.contains("<Message>"));
}

#[actix_web::test]
async fn test_unknown_text_gets_help_reply() {
    let h = harness();
    let app = test::init_service(create_app(h.state.clone())).await;

    let body = send_signed(&app, h.state.get_ref(), "hola, ¿qué puedes hacer?").await;

    assert!(body.contains("saldo"));
    assert!(body.contains("transferir"));
    assert!(body.contains("CONFIRMAR"));
}

#[actix_web::test]
async fn test_balance_query_starts_challenge_without_recent_approval() {
    let h = harness();
    let app = test::init_service(create_app(h.state.clone())).await;

    let body = send_signed(&app, h.state.get_ref(), "saldo").await;

    assert!(body.contains("CONFIRMAR"));
    let sessions = h.sessions.get_all();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].status, SessionStatus::Pending);
    assert_eq!(h.audit.count_of(AuditEventType::ChallengeSent), 1);
}

#[actix_web::test]
async fn test_balance_flow_with_confirmation() {
    let h = harness();
    h.ledger
        .set_balance(&support::test_phone(), Decimal::new(150075, 2));
    let app = test::init_service(create_app(h.state.clone())).await;

    let challenge = send_signed(&app, h.state.get_ref(), "saldo").await;
    assert!(challenge.contains("código"));

    let confirmed = send_signed(
        &app,
        h.state.get_ref(),
        &format!("CONFIRMAR {}", ACCEPT_CODE),
    )
    .await;
    assert!(confirmed.contains("Verificación exitosa"));

    // The approval is recent, so the repeat query answers directly
    let balance = send_signed(&app, h.state.get_ref(), "saldo").await;
    assert!(balance.contains("Tu saldo es $1500.75 MXN"));
    assert_eq!(h.audit.count_of(AuditEventType::BalanceQueried), 1);
}

#[actix_web::test]
async fn test_wrong_code_counts_down_attempts() {
    let h = harness();
    let app = test::init_service(create_app(h.state.clone())).await;

    send_signed(&app, h.state.get_ref(), "saldo").await;
    let body = send_signed(&app, h.state.get_ref(), "CONFIRMAR 999999").await;

    assert!(body.contains("Código incorrecto"));
    assert!(body.contains("2 intentos"));
    let sessions = h.sessions.get_all();
    assert_eq!(sessions[0].status, SessionStatus::Pending);
    assert_eq!(sessions[0].attempts, 1);
}

#[actix_web::test]
async fn test_large_transfer_parks_until_confirmed() {
    let h = harness();
    let phone = support::test_phone();
    h.ledger.set_balance(&phone, Decimal::new(5000, 0));
    let app = test::init_service(create_app(h.state.clone())).await;

    // Above the two-factor threshold: parked, challenge sent
    let parked = send_signed(
        &app,
        h.state.get_ref(),
        &format!("transferir 2000 a {}", ACCOUNT),
    )
    .await;
    assert!(parked.contains("CONFIRMAR"));
    assert!(parked.contains("$2000 MXN"));
    assert_eq!(h.ledger.balance_of(&phone), Decimal::new(5000, 0));
    let rows = h.transfers.get_all();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, TransferStatus::RequiresVerification);

    // Confirming the code promotes and executes the parked transfer
    let executed = send_signed(
        &app,
        h.state.get_ref(),
        &format!("CONFIRMAR {}", ACCEPT_CODE),
    )
    .await;
    assert!(executed.contains("Transferencia de $2000 MXN ejecutada"));
    assert!(executed.contains("Folio: LGR-1"));
    assert_eq!(h.ledger.balance_of(&phone), Decimal::new(3000, 0));
    let rows = h.transfers.get_all();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, TransferStatus::Executed);
    assert_eq!(h.audit.count_of(AuditEventType::TransferExecuted), 1);
}

#[actix_web::test]
async fn test_small_transfer_executes_immediately() {
    let h = harness();
    let phone = support::test_phone();
    h.ledger.set_balance(&phone, Decimal::new(500, 0));
    let app = test::init_service(create_app(h.state.clone())).await;

    let body = send_signed(
        &app,
        h.state.get_ref(),
        &format!("transferir 100 a {}", ACCOUNT),
    )
    .await;

    assert!(body.contains("Transferencia de $100 MXN ejecutada"));
    assert_eq!(h.ledger.balance_of(&phone), Decimal::new(400, 0));
    // No challenge was needed below the threshold
    assert!(h.sessions.get_all().is_empty());
}

#[actix_web::test]
async fn test_transfer_without_destination_gets_format_hint() {
    let h = harness();
    let app = test::init_service(create_app(h.state.clone())).await;

    let body = send_signed(&app, h.state.get_ref(), "transferir 100").await;

    assert!(body.contains("monto y la cuenta"));
    assert!(h.transfers.get_all().is_empty());
}

#[actix_web::test]
async fn test_insufficient_funds_rejection_reply() {
    let h = harness();
    let phone = support::test_phone();
    h.ledger.set_balance(&phone, Decimal::new(50, 0));
    let app = test::init_service(create_app(h.state.clone())).await;

    let body = send_signed(
        &app,
        h.state.get_ref(),
        &format!("transferir 100 a {}", ACCOUNT),
    )
    .await;

    assert!(body.contains("Fondos insuficientes"));
    assert_eq!(h.ledger.balance_of(&phone), Decimal::new(50, 0));
    let rows = h.transfers.get_all();
    assert_eq!(rows[0].status, TransferStatus::Rejected);
    assert_eq!(h.audit.count_of(AuditEventType::TransferRejected), 1);
}

#[actix_web::test]
async fn test_inbound_rate_limit_replies_in_band() {
    let mut rate_limit = RateLimitConfig::development();
    rate_limit.inbound = WindowLimit::new(2, 60);
    let h = harness_with_rate_limit(rate_limit);
    let app = test::init_service(create_app(h.state.clone())).await;

    send_signed(&app, h.state.get_ref(), "hola").await;
    send_signed(&app, h.state.get_ref(), "hola").await;
    // Third message in the window: still HTTP 200, throttle reply in-band
    let body = send_signed(&app, h.state.get_ref(), "hola").await;

    assert!(body.contains("Demasiados mensajes"));
    assert_eq!(h.audit.count_of(AuditEventType::RateLimitExceeded), 1);
}
