//! End-to-end transfer flow with the two-factor gate wired to verification
//!
//! Builds the transfer service and the verification orchestrator over one
//! shared session store, then drives the WhatsApp shape of a gated
//! transfer: refused first, verified, executed exactly once, replayed on
//! duplicate tokens.

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use cb_core::domain::entities::transfer_request::{TransferRequest, TransferStatus};
    use cb_core::domain::entities::verification_session::Channel;
    use cb_core::errors::{DomainError, TransferError};
    use cb_core::repositories::{
        MockAuditLogRepository, MockLockoutRepository, MockTransferRepository,
        MockVerificationSessionRepository,
    };
    use cb_core::services::audit::{AuditService, AuditServiceConfig};
    use cb_core::services::lockout::{LockoutConfig, LockoutTracker};
    use cb_core::services::rate_limit::InMemoryRateLimiter;
    use cb_core::services::transfer::{
        BalanceInfo, LedgerError, LedgerExecutor, LedgerReceipt, TransferOutcome, TransferService,
        TransferServiceConfig, TransferSubmission,
    };
    use cb_core::services::verification::{
        ChallengeProvider, ProviderChallenge, ProviderCheckStatus, ProviderError,
        VerificationConfig, VerificationService,
    };
    use cb_shared::config::{RateLimitConfig, WindowLimit};
    use cb_shared::types::PhoneNumber;

    const GOOD_CODE: &str = "314159";

    /// Provider stub that accepts exactly one code
    struct FixedCodeProvider {
        accept_code: String,
    }

    #[async_trait]
    impl ChallengeProvider for FixedCodeProvider {
        async fn start_challenge(
            &self,
            _phone: &PhoneNumber,
            _channel: Channel,
        ) -> Result<ProviderChallenge, ProviderError> {
            Ok(ProviderChallenge {
                provider_ref: "VE0001".to_string(),
            })
        }

        async fn check_code(
            &self,
            _phone: &PhoneNumber,
            code: &str,
        ) -> Result<ProviderCheckStatus, ProviderError> {
            if code == self.accept_code {
                Ok(ProviderCheckStatus::Approved)
            } else {
                Ok(ProviderCheckStatus::Incorrect)
            }
        }
    }

    /// Ledger stub that settles everything and replays by token
    struct CountingLedger {
        receipts: Mutex<HashMap<String, LedgerReceipt>>,
        execute_calls: Mutex<u32>,
    }

    impl CountingLedger {
        fn new() -> Self {
            Self {
                receipts: Mutex::new(HashMap::new()),
                execute_calls: Mutex::new(0),
            }
        }

        fn execute_calls(&self) -> u32 {
            *self.execute_calls.lock().unwrap()
        }

        fn settled_count(&self) -> usize {
            self.receipts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LedgerExecutor for CountingLedger {
        async fn execute_transfer(
            &self,
            request: &TransferRequest,
        ) -> Result<LedgerReceipt, LedgerError> {
            *self.execute_calls.lock().unwrap() += 1;
            let mut receipts = self.receipts.lock().unwrap();
            if let Some(receipt) = receipts.get(&request.idempotency_token) {
                return Ok(receipt.clone());
            }
            let receipt = LedgerReceipt {
                reference: format!("LGR-{:06}", receipts.len() + 1),
                executed_at: Utc::now(),
            };
            receipts.insert(request.idempotency_token.clone(), receipt.clone());
            Ok(receipt)
        }

        async fn balance(&self, phone: &PhoneNumber) -> Result<BalanceInfo, LedgerError> {
            Ok(BalanceInfo {
                phone: phone.clone(),
                balance: Decimal::new(5000_00, 2),
                currency: "MXN".to_string(),
            })
        }
    }

    type Verifier = VerificationService<
        FixedCodeProvider,
        MockVerificationSessionRepository,
        MockLockoutRepository,
        InMemoryRateLimiter,
        MockAuditLogRepository,
    >;

    type Transfers = TransferService<
        MockTransferRepository,
        CountingLedger,
        MockVerificationSessionRepository,
        MockAuditLogRepository,
    >;

    struct Flow {
        sessions: Arc<MockVerificationSessionRepository>,
        transfers: Arc<MockTransferRepository>,
        ledger: Arc<CountingLedger>,
        verifier: Verifier,
        service: Transfers,
    }

    fn generous_limits() -> RateLimitConfig {
        let mut config = RateLimitConfig::default();
        config.enabled = true;
        config.inbound = WindowLimit::new(100, 60);
        config.verify_send = WindowLimit::new(100, 60);
        config.verify_check = WindowLimit::new(100, 60);
        config
    }

    fn flow() -> Flow {
        let sessions = Arc::new(MockVerificationSessionRepository::new());
        let transfers = Arc::new(MockTransferRepository::new());
        let ledger = Arc::new(CountingLedger::new());
        let audit_log = Arc::new(MockAuditLogRepository::new());

        let verifier = VerificationService::new(
            Arc::new(FixedCodeProvider {
                accept_code: GOOD_CODE.to_string(),
            }),
            sessions.clone(),
            LockoutTracker::new(
                Arc::new(MockLockoutRepository::new()),
                LockoutConfig::default(),
            ),
            Arc::new(InMemoryRateLimiter::new(generous_limits())),
            AuditService::new(
                audit_log.clone(),
                AuditServiceConfig {
                    async_writes: false,
                },
            ),
            VerificationConfig::default(),
        );
        let service = TransferService::new(
            transfers.clone(),
            ledger.clone(),
            sessions.clone(),
            AuditService::new(
                audit_log,
                AuditServiceConfig {
                    async_writes: false,
                },
            ),
            TransferServiceConfig::default(),
        );
        Flow {
            sessions,
            transfers,
            ledger,
            verifier,
            service,
        }
    }

    fn phone() -> PhoneNumber {
        PhoneNumber::parse("+521234567890", "52").unwrap()
    }

    fn submission(amount: Decimal, token: &str) -> TransferSubmission {
        TransferSubmission {
            phone: phone(),
            destination: "12345678901234".to_string(),
            amount,
            currency: None,
            concept: Some("renta".to_string()),
            idempotency_token: token.to_string(),
        }
    }

    #[tokio::test]
    async fn a_gated_transfer_completes_after_verification() {
        let flow = flow();
        let phone = phone();
        let big = submission(Decimal::new(2500_00, 2), "tok-rent-august");

        // Step 1: above threshold with no approval on file, nothing durable
        match flow.service.submit(big.clone()).await.unwrap_err() {
            DomainError::Transfer(TransferError::VerificationRequired) => {}
            other => panic!("Expected VerificationRequired, got {:?}", other),
        }
        assert!(flow.transfers.get_all().is_empty());
        assert_eq!(flow.ledger.execute_calls(), 0);

        // Step 2: pass the challenge
        flow.verifier
            .start_challenge(&phone, Channel::Whatsapp)
            .await
            .unwrap();
        let outcome = flow
            .verifier
            .check_response(&phone, GOOD_CODE)
            .await
            .unwrap();
        assert!(outcome.is_approved());

        // Step 3: the same submission now records and executes once
        let first = flow.service.submit(big.clone()).await.unwrap();
        let reference = match &first {
            TransferOutcome::Executed { request, replayed } => {
                assert!(!replayed);
                assert_eq!(request.status, TransferStatus::Executed);
                request.outcome_ref.clone()
            }
            other => panic!("Expected execution, got {:?}", other),
        };
        assert!(reference.is_some());

        // Step 4: a duplicate token replays the stored outcome
        let second = flow.service.submit(big).await.unwrap();
        match &second {
            TransferOutcome::Executed { request, replayed } => {
                assert!(*replayed);
                assert_eq!(request.outcome_ref, reference);
            }
            other => panic!("Expected replayed execution, got {:?}", other),
        }
        assert_eq!(flow.ledger.execute_calls(), 1);
        assert_eq!(flow.ledger.settled_count(), 1);
    }

    #[tokio::test]
    async fn a_denied_verification_keeps_the_gate_shut() {
        let flow = flow();
        let phone = phone();
        let big = submission(Decimal::new(2000_00, 2), "tok-furniture");

        match flow.service.submit(big.clone()).await.unwrap_err() {
            DomainError::Transfer(TransferError::VerificationRequired) => {}
            other => panic!("Expected VerificationRequired, got {:?}", other),
        }

        // Burn the whole session on wrong codes
        flow.verifier
            .start_challenge(&phone, Channel::Whatsapp)
            .await
            .unwrap();
        for code in ["000001", "000002", "000003"] {
            flow.verifier.check_response(&phone, code).await.unwrap();
        }

        // A Denied session satisfies nothing; the gate still refuses
        match flow.service.submit(big).await.unwrap_err() {
            DomainError::Transfer(TransferError::VerificationRequired) => {}
            other => panic!("Expected VerificationRequired, got {:?}", other),
        }
        assert!(flow.transfers.get_all().is_empty());
        assert_eq!(flow.ledger.execute_calls(), 0);
    }

    #[tokio::test]
    async fn a_parked_transfer_promotes_after_the_challenge() {
        let flow = flow();
        let phone = phone();

        // Step 1: the conversational path parks instead of refusing
        let parked = flow
            .service
            .park_pending(submission(Decimal::new(1500_00, 2), "wa-7f3a"))
            .await
            .unwrap();
        assert_eq!(parked.status, TransferStatus::RequiresVerification);
        assert_eq!(flow.ledger.execute_calls(), 0);

        // Step 2: the identity passes its challenge
        flow.verifier
            .start_challenge(&phone, Channel::Whatsapp)
            .await
            .unwrap();
        assert!(flow
            .verifier
            .check_response(&phone, GOOD_CODE)
            .await
            .unwrap()
            .is_approved());

        // Step 3: confirmation promotes and settles the parked row
        let outcome = flow
            .service
            .promote_and_execute(&phone)
            .await
            .unwrap()
            .expect("a parked transfer should promote");
        match outcome {
            TransferOutcome::Executed { request, replayed } => {
                assert!(!replayed);
                assert_eq!(request.idempotency_token, "wa-7f3a");
                assert_eq!(request.status, TransferStatus::Executed);
            }
            other => panic!("Expected execution, got {:?}", other),
        }

        // Step 4: nothing left to promote
        assert!(flow
            .service
            .promote_and_execute(&phone)
            .await
            .unwrap()
            .is_none());
        assert_eq!(flow.ledger.settled_count(), 1);
    }

    #[tokio::test]
    async fn a_small_transfer_needs_no_ceremony() {
        let flow = flow();

        let outcome = flow
            .service
            .submit(submission(Decimal::new(400_00, 2), "tok-lunch"))
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            TransferOutcome::Executed { replayed: false, .. }
        ));

        // No challenge was ever opened for it
        assert!(flow.sessions.get_all().is_empty());
        assert_eq!(flow.ledger.execute_calls(), 1);
    }
}
