//! Mock implementation of TransferRepository for testing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use cb_shared::types::PhoneNumber;

use crate::domain::entities::transfer_request::{TransferRequest, TransferStatus};
use crate::errors::DomainError;

use super::{RecordOutcome, TransferRepository};

/// Mock implementation of TransferRepository for testing
///
/// A single mutex guards the whole store, so `record` and the `mark_*`
/// compare-and-set methods behave exactly like their transactional MySQL
/// counterparts under concurrent callers.
pub struct MockTransferRepository {
    requests: Arc<Mutex<Vec<TransferRequest>>>,
    should_fail: Arc<Mutex<bool>>,
}

impl MockTransferRepository {
    /// Create a new mock repository
    pub fn new() -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            should_fail: Arc::new(Mutex::new(false)),
        }
    }

    /// Set whether operations should fail
    pub fn set_should_fail(&self, should_fail: bool) {
        *self.should_fail.lock().unwrap() = should_fail;
    }

    /// Seed a request directly, bypassing the uniqueness check
    pub fn insert_raw(&self, request: TransferRequest) {
        self.requests.lock().unwrap().push(request);
    }

    /// Fetch a request by id for assertions
    pub fn get(&self, id: Uuid) -> Option<TransferRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    /// Get all stored requests for assertions
    pub fn get_all(&self) -> Vec<TransferRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn fail_check(&self) -> Result<(), DomainError> {
        if *self.should_fail.lock().unwrap() {
            return Err(DomainError::Internal {
                message: "Mock repository error".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for MockTransferRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransferRepository for MockTransferRepository {
    async fn record(&self, request: &TransferRequest) -> Result<RecordOutcome, DomainError> {
        self.fail_check()?;

        let mut requests = self.requests.lock().unwrap();
        if let Some(existing) = requests
            .iter()
            .find(|r| r.phone == request.phone && r.idempotency_token == request.idempotency_token)
        {
            return Ok(RecordOutcome::Existing(existing.clone()));
        }
        requests.push(request.clone());
        Ok(RecordOutcome::Created)
    }

    async fn find_by_token(
        &self,
        phone: &PhoneNumber,
        token: &str,
    ) -> Result<Option<TransferRequest>, DomainError> {
        self.fail_check()?;

        let requests = self.requests.lock().unwrap();
        Ok(requests
            .iter()
            .find(|r| r.phone == *phone && r.idempotency_token == token)
            .cloned())
    }

    async fn mark_executed(
        &self,
        id: Uuid,
        outcome_ref: &str,
        executed_at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        self.fail_check()?;

        let mut requests = self.requests.lock().unwrap();
        match requests
            .iter_mut()
            .find(|r| r.id == id && r.status == TransferStatus::Recorded)
        {
            Some(request) => {
                request.status = TransferStatus::Executed;
                request.outcome_ref = Some(outcome_ref.to_string());
                request.executed_at = Some(executed_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_rejected(&self, id: Uuid, reason: &str) -> Result<bool, DomainError> {
        self.fail_check()?;

        let mut requests = self.requests.lock().unwrap();
        match requests
            .iter_mut()
            .find(|r| r.id == id && r.status == TransferStatus::Recorded)
        {
            Some(request) => {
                request.status = TransferStatus::Rejected;
                request.reject_reason = Some(reason.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn promote_to_recorded(&self, id: Uuid) -> Result<bool, DomainError> {
        self.fail_check()?;

        let mut requests = self.requests.lock().unwrap();
        match requests
            .iter_mut()
            .find(|r| r.id == id && r.status == TransferStatus::RequiresVerification)
        {
            Some(request) => {
                request.status = TransferStatus::Recorded;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_oldest_awaiting(
        &self,
        phone: &PhoneNumber,
    ) -> Result<Option<TransferRequest>, DomainError> {
        self.fail_check()?;

        let requests = self.requests.lock().unwrap();
        Ok(requests
            .iter()
            .filter(|r| r.phone == *phone && r.status == TransferStatus::RequiresVerification)
            .min_by_key(|r| r.created_at)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn phone() -> PhoneNumber {
        PhoneNumber::parse("+521234567890", "52").unwrap()
    }

    fn request(token: &str) -> TransferRequest {
        TransferRequest::recorded(
            phone(),
            "012345678901234567",
            Decimal::new(150_00, 2),
            "MXN",
            None,
            token,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn record_reports_existing_on_duplicate_token() {
        let repo = MockTransferRepository::new();
        let first = request("tok-1");

        assert!(matches!(
            repo.record(&first).await.unwrap(),
            RecordOutcome::Created
        ));

        let duplicate = request("tok-1");
        match repo.record(&duplicate).await.unwrap() {
            RecordOutcome::Existing(stored) => assert_eq!(stored.id, first.id),
            RecordOutcome::Created => panic!("duplicate token must not create a second row"),
        }
        assert_eq!(repo.get_all().len(), 1);
    }

    #[tokio::test]
    async fn mark_executed_wins_only_once() {
        let repo = MockTransferRepository::new();
        let req = request("tok-1");
        repo.insert_raw(req.clone());

        let now = Utc::now();
        assert!(repo.mark_executed(req.id, "TX-1", now).await.unwrap());
        assert!(!repo.mark_executed(req.id, "TX-2", now).await.unwrap());

        let stored = repo.get(req.id).unwrap();
        assert_eq!(stored.status, TransferStatus::Executed);
        assert_eq!(stored.outcome_ref.as_deref(), Some("TX-1"));
    }

    #[tokio::test]
    async fn promote_moves_parked_request_exactly_once() {
        let repo = MockTransferRepository::new();
        let parked = TransferRequest::awaiting_verification(
            phone(),
            "012345678901234567",
            Decimal::new(2000_00, 2),
            "MXN",
            None,
            "tok-2",
        )
        .unwrap();
        repo.insert_raw(parked.clone());

        let found = repo.find_oldest_awaiting(&phone()).await.unwrap().unwrap();
        assert_eq!(found.id, parked.id);

        assert!(repo.promote_to_recorded(parked.id).await.unwrap());
        assert!(!repo.promote_to_recorded(parked.id).await.unwrap());
        assert!(repo.find_oldest_awaiting(&phone()).await.unwrap().is_none());
        assert_eq!(repo.get(parked.id).unwrap().status, TransferStatus::Recorded);
    }

    #[tokio::test]
    async fn oldest_awaiting_prefers_earliest_created() {
        let repo = MockTransferRepository::new();

        let mut older = TransferRequest::awaiting_verification(
            phone(),
            "012345678901234567",
            Decimal::ONE,
            "MXN",
            None,
            "tok-old",
        )
        .unwrap();
        older.created_at = Utc::now() - chrono::Duration::minutes(5);
        let newer = TransferRequest::awaiting_verification(
            phone(),
            "012345678901234567",
            Decimal::ONE,
            "MXN",
            None,
            "tok-new",
        )
        .unwrap();

        repo.insert_raw(newer);
        repo.insert_raw(older.clone());

        let found = repo.find_oldest_awaiting(&phone()).await.unwrap().unwrap();
        assert_eq!(found.id, older.id);
    }
}
