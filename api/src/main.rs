//! CarteraBot server binary
//!
//! Wires the production backends (MySQL, Redis, the configured verify and
//! ledger backends) into the domain services and runs the HTTP server.

use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, HttpServer};
use anyhow::Context;
use rust_decimal::Decimal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cb_api::app::{create_app, AppState};
use cb_core::services::lockout::{LockoutConfig, LockoutTracker};
use cb_core::services::transfer::{TransferService, TransferServiceConfig};
use cb_core::services::verification::{VerificationConfig, VerificationService};
use cb_core::services::{AuditService, AuditServiceConfig, RuleIntentParser, WebhookSignatureValidator};
use cb_infra::cache::{RedisClient, RedisRateLimiter};
use cb_infra::database::mysql::{
    MySqlAuditLogRepository, MySqlLockoutRepository, MySqlTransferRepository,
    MySqlVerificationSessionRepository,
};
use cb_infra::database::DatabasePool;
use cb_infra::ledger::LedgerBackend;
use cb_infra::verify::VerifyBackend;
use cb_shared::config::LogFormat;
use cb_shared::{AppConfig, LoggingConfig, PhoneNumber};

/// Demo wallet provisioned in development when `TRANSFER_DEMO_SEED` is on
const DEMO_WALLET_PHONE: &str = "+521234567890";
const DEMO_WALLET_BALANCE: Decimal = Decimal::from_parts(100000, 0, 0, false, 2);

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env();
    init_tracing(&config.logging);

    info!(
        environment = %config.environment,
        version = env!("CARGO_PKG_VERSION"),
        "starting CarteraBot server"
    );

    let db = DatabasePool::new(&config.database)
        .await
        .context("database pool initialization failed")?;
    db.health_check()
        .await
        .context("database is not reachable")?;
    info!(pool = %db.statistics(), "database pool ready");

    let redis = RedisClient::new(config.cache.clone())
        .await
        .context("redis connection failed")?;

    let sessions = Arc::new(MySqlVerificationSessionRepository::new(db.pool().clone()));
    let lockouts = Arc::new(MySqlLockoutRepository::new(db.pool().clone()));
    let transfer_repo = Arc::new(MySqlTransferRepository::new(db.pool().clone()));
    let audit_repo = Arc::new(MySqlAuditLogRepository::new(db.pool().clone()));

    let provider = Arc::new(VerifyBackend::from_config(&config.verify)?);
    let ledger = LedgerBackend::from_config(&config.transfer, db.pool().clone())?;

    if config.environment.is_development() && config.transfer.demo_seed {
        if let LedgerBackend::Local(local) = &ledger {
            let demo_phone =
                PhoneNumber::parse(DEMO_WALLET_PHONE, &config.verify.default_country_code)
                    .context("demo wallet phone is invalid")?;
            local.seed_wallet(&demo_phone, DEMO_WALLET_BALANCE).await?;
            info!(phone = %demo_phone.masked(), "demo wallet ready");
        }
    }
    let ledger = Arc::new(ledger);

    let rate_limiter = Arc::new(RedisRateLimiter::new(
        redis.clone(),
        config.rate_limit.clone(),
    ));

    let audit_config = AuditServiceConfig::default();
    let lockout = LockoutTracker::new(Arc::clone(&lockouts), LockoutConfig::from(&config.verify));

    let verification = Arc::new(VerificationService::new(
        provider,
        Arc::clone(&sessions),
        lockout,
        Arc::clone(&rate_limiter),
        AuditService::new(Arc::clone(&audit_repo), audit_config),
        VerificationConfig::from(&config.verify),
    ));

    let transfers = Arc::new(TransferService::new(
        transfer_repo,
        ledger,
        Arc::clone(&sessions),
        AuditService::new(Arc::clone(&audit_repo), audit_config),
        TransferServiceConfig::from(&config.transfer),
    ));

    let bind_address = config.server.bind_address();
    let workers = config.server.workers;
    let keep_alive = config.server.keep_alive;

    let state = web::Data::new(AppState {
        verification,
        transfers,
        rate_limiter,
        audit: AuditService::new(audit_repo, audit_config),
        signature_validator: WebhookSignatureValidator::new(config.webhook.signing_secret.clone()),
        intent_parser: RuleIntentParser::new(),
        config,
    });

    info!(%bind_address, "HTTP server listening");

    let mut server = HttpServer::new(move || create_app(state.clone()))
        .keep_alive(Duration::from_secs(keep_alive));
    if workers > 0 {
        server = server.workers(workers);
    }
    server
        .bind(&bind_address)
        .with_context(|| format!("cannot bind {}", bind_address))?
        .run()
        .await?;

    Ok(())
}

fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.colored)
        .with_file(config.source_location)
        .with_line_number(config.source_location);

    match config.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.init(),
    }
}
