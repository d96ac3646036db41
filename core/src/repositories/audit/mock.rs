//! Mock implementation of AuditLogRepository for testing.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use super::AuditLogRepository;
use crate::domain::entities::audit::{AuditEventType, AuditRecord};
use crate::errors::DomainError;

/// Mock implementation of AuditLogRepository for testing
pub struct MockAuditLogRepository {
    records: Arc<Mutex<Vec<AuditRecord>>>,
    should_fail: Arc<Mutex<bool>>,
}

impl MockAuditLogRepository {
    /// Create a new mock repository
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            should_fail: Arc::new(Mutex::new(false)),
        }
    }

    /// Set whether operations should fail
    pub fn set_should_fail(&self, should_fail: bool) {
        *self.should_fail.lock().unwrap() = should_fail;
    }

    /// Get all stored records for assertions
    pub fn get_all(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Count records of one event type
    pub fn count_of(&self, event_type: AuditEventType) -> usize {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.event_type == event_type)
            .count()
    }

    /// Clear all records
    pub fn clear(&self) {
        self.records.lock().unwrap().clear();
    }
}

impl Default for MockAuditLogRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditLogRepository for MockAuditLogRepository {
    async fn append(&self, record: &AuditRecord) -> Result<(), DomainError> {
        if *self.should_fail.lock().unwrap() {
            return Err(DomainError::Internal {
                message: "Mock repository error".to_string(),
            });
        }

        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}
