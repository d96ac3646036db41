//! Shared fixtures for the API integration tests
//!
//! The harness assembles [`AppState`] over the in-memory test doubles
//! from `cb_core` plus a fake ledger, so requests exercise the real
//! routes, middleware and services without MySQL, Redis or Twilio.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use actix_web::web;
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use cb_api::app::AppState;
use cb_core::domain::entities::transfer_request::TransferRequest;
use cb_core::repositories::{
    MockAuditLogRepository, MockLockoutRepository, MockTransferRepository,
    MockVerificationSessionRepository,
};
use cb_core::services::lockout::{LockoutConfig, LockoutTracker};
use cb_core::services::transfer::{
    BalanceInfo, LedgerError, LedgerExecutor, LedgerReceipt, TransferService,
    TransferServiceConfig,
};
use cb_core::services::verification::{VerificationConfig, VerificationService};
use cb_core::services::{
    AuditService, AuditServiceConfig, InMemoryRateLimiter, RuleIntentParser,
    WebhookSignatureValidator,
};
use cb_infra::verify::MockVerifyClient;
use cb_shared::{AppConfig, PhoneNumber, RateLimitConfig};

/// Signing secret the harness configures for the webhook
pub const TEST_SECRET: &str = "test-signing-secret";

/// Code the mock provider accepts
pub const ACCEPT_CODE: &str = "123456";

/// In-memory ledger: a balance map plus idempotent settlement by token
pub struct FakeLedger {
    balances: Mutex<HashMap<String, Decimal>>,
    settled: Mutex<HashMap<String, LedgerReceipt>>,
    unavailable: Mutex<bool>,
    currency: String,
}

impl FakeLedger {
    pub fn new() -> Self {
        Self {
            balances: Mutex::new(HashMap::new()),
            settled: Mutex::new(HashMap::new()),
            unavailable: Mutex::new(false),
            currency: "MXN".to_string(),
        }
    }

    pub fn set_balance(&self, phone: &PhoneNumber, amount: Decimal) {
        self.balances
            .lock()
            .unwrap()
            .insert(phone.as_e164().to_string(), amount);
    }

    pub fn balance_of(&self, phone: &PhoneNumber) -> Decimal {
        self.balances
            .lock()
            .unwrap()
            .get(phone.as_e164())
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }

    pub fn settled_count(&self) -> usize {
        self.settled.lock().unwrap().len()
    }
}

#[async_trait]
impl LedgerExecutor for FakeLedger {
    async fn execute_transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<LedgerReceipt, LedgerError> {
        if *self.unavailable.lock().unwrap() {
            return Err(LedgerError::Unavailable {
                reason: "fake outage".to_string(),
            });
        }

        // Idempotent on the token, like the real backends
        if let Some(receipt) = self
            .settled
            .lock()
            .unwrap()
            .get(&request.idempotency_token)
        {
            return Ok(receipt.clone());
        }

        let mut balances = self.balances.lock().unwrap();
        let balance = match balances.get_mut(request.phone.as_e164()) {
            Some(balance) => balance,
            None => {
                return Err(LedgerError::Rejected {
                    reason: "no wallet for this identity".to_string(),
                })
            }
        };
        if *balance < request.amount {
            return Err(LedgerError::Rejected {
                reason: "insufficient funds".to_string(),
            });
        }
        *balance -= request.amount;

        let mut settled = self.settled.lock().unwrap();
        let receipt = LedgerReceipt {
            reference: format!("LGR-{}", settled.len() + 1),
            executed_at: Utc::now(),
        };
        settled.insert(request.idempotency_token.clone(), receipt.clone());
        Ok(receipt)
    }

    async fn balance(&self, phone: &PhoneNumber) -> Result<BalanceInfo, LedgerError> {
        Ok(BalanceInfo {
            phone: phone.clone(),
            balance: self.balance_of(phone),
            currency: self.currency.clone(),
        })
    }
}

pub type TestState = AppState<
    MockVerifyClient,
    MockVerificationSessionRepository,
    MockLockoutRepository,
    InMemoryRateLimiter,
    MockAuditLogRepository,
    MockTransferRepository,
    FakeLedger,
>;

/// The assembled state plus direct handles on the doubles for assertions
pub struct TestHarness {
    pub state: web::Data<TestState>,
    pub sessions: Arc<MockVerificationSessionRepository>,
    pub transfers: Arc<MockTransferRepository>,
    pub audit: Arc<MockAuditLogRepository>,
    pub ledger: Arc<FakeLedger>,
}

pub fn harness() -> TestHarness {
    harness_with_rate_limit(RateLimitConfig::development())
}

pub fn harness_with_rate_limit(rate_limit: RateLimitConfig) -> TestHarness {
    let mut config = AppConfig::development();
    config.webhook.signing_secret = TEST_SECRET.to_string();
    config.webhook.public_base_url = "https://bot.test".to_string();
    config.rate_limit = rate_limit.clone();

    let sessions = Arc::new(MockVerificationSessionRepository::new());
    let lockouts = Arc::new(MockLockoutRepository::new());
    let transfers_repo = Arc::new(MockTransferRepository::new());
    let audit_repo = Arc::new(MockAuditLogRepository::new());
    let ledger = Arc::new(FakeLedger::new());
    let provider = Arc::new(MockVerifyClient::new(ACCEPT_CODE));
    let rate_limiter = Arc::new(InMemoryRateLimiter::new(rate_limit));

    // Synchronous audit writes so assertions observe records immediately
    let audit_config = AuditServiceConfig {
        async_writes: false,
    };

    let verification = Arc::new(VerificationService::new(
        provider,
        Arc::clone(&sessions),
        LockoutTracker::new(Arc::clone(&lockouts), LockoutConfig::from(&config.verify)),
        Arc::clone(&rate_limiter),
        AuditService::new(Arc::clone(&audit_repo), audit_config),
        VerificationConfig::from(&config.verify),
    ));

    let transfers = Arc::new(TransferService::new(
        Arc::clone(&transfers_repo),
        Arc::clone(&ledger),
        Arc::clone(&sessions),
        AuditService::new(Arc::clone(&audit_repo), audit_config),
        TransferServiceConfig::from(&config.transfer),
    ));

    let state = web::Data::new(AppState {
        verification,
        transfers,
        rate_limiter,
        audit: AuditService::new(Arc::clone(&audit_repo), audit_config),
        signature_validator: WebhookSignatureValidator::new(TEST_SECRET),
        intent_parser: RuleIntentParser::new(),
        config,
    });

    TestHarness {
        state,
        sessions,
        transfers: transfers_repo,
        audit: audit_repo,
        ledger,
    }
}

/// Sign a webhook form the way the gateway does
pub fn sign_form(state: &TestState, path: &str, params: &[(String, String)]) -> String {
    state
        .signature_validator
        .sign(&state.config.webhook.public_url(path), params)
}

/// Convenience constructor for form pairs
pub fn form(from: &str, body: &str) -> Vec<(String, String)> {
    vec![
        ("From".to_string(), from.to_string()),
        ("Body".to_string(), body.to_string()),
    ]
}

pub fn test_phone() -> PhoneNumber {
    PhoneNumber::parse("+525511223344", "52").unwrap()
}
