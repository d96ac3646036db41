//! Mock implementation of VerificationSessionRepository for testing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use cb_shared::types::PhoneNumber;

use crate::domain::entities::verification_session::{SessionStatus, VerificationSession};
use crate::errors::DomainError;

use super::VerificationSessionRepository;

/// Mock implementation of VerificationSessionRepository for testing
///
/// All mutations run inside one mutex-guarded section, giving the same
/// per-identity atomicity the MySQL implementation gets from transactions.
pub struct MockVerificationSessionRepository {
    sessions: Arc<Mutex<HashMap<Uuid, VerificationSession>>>,
    should_fail: Arc<Mutex<bool>>,
}

impl MockVerificationSessionRepository {
    /// Create a new mock repository
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            should_fail: Arc::new(Mutex::new(false)),
        }
    }

    /// Set whether operations should fail
    pub fn set_should_fail(&self, should_fail: bool) {
        *self.should_fail.lock().unwrap() = should_fail;
    }

    /// Seed a session directly, bypassing the supersede logic
    /// (for tests that need stale or terminal state)
    pub fn insert_raw(&self, session: VerificationSession) {
        self.sessions.lock().unwrap().insert(session.id, session);
    }

    /// Fetch a session by id for assertions
    pub fn get(&self, id: Uuid) -> Option<VerificationSession> {
        self.sessions.lock().unwrap().get(&id).cloned()
    }

    /// Get all stored sessions for assertions
    pub fn get_all(&self) -> Vec<VerificationSession> {
        self.sessions.lock().unwrap().values().cloned().collect()
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

impl Default for MockVerificationSessionRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VerificationSessionRepository for MockVerificationSessionRepository {
    async fn insert_superseding(&self, session: &VerificationSession) -> Result<u64, DomainError> {
        self.fail_check()?;

        let mut sessions = self.sessions.lock().unwrap();
        let mut superseded = 0u64;
        for existing in sessions.values_mut() {
            if existing.phone == session.phone && existing.is_pending() {
                existing.transition(SessionStatus::Expired);
                superseded += 1;
            }
        }
        sessions.insert(session.id, session.clone());
        Ok(superseded)
    }

    async fn find_pending(
        &self,
        phone: &PhoneNumber,
    ) -> Result<Option<VerificationSession>, DomainError> {
        self.fail_check()?;

        let sessions = self.sessions.lock().unwrap();
        Ok(sessions
            .values()
            .find(|s| s.phone == *phone && s.is_pending())
            .cloned())
    }

    async fn transition_from_pending(
        &self,
        id: Uuid,
        to: SessionStatus,
    ) -> Result<bool, DomainError> {
        self.fail_check()?;

        let mut sessions = self.sessions.lock().unwrap();
        match sessions.get_mut(&id) {
            Some(session) if session.is_pending() => Ok(session.transition(to)),
            _ => Ok(false),
        }
    }

    async fn increment_attempts(&self, id: Uuid) -> Result<Option<u32>, DomainError> {
        self.fail_check()?;

        let mut sessions = self.sessions.lock().unwrap();
        Ok(sessions.get_mut(&id).and_then(|s| s.record_attempt()))
    }

    async fn find_approved_since(
        &self,
        phone: &PhoneNumber,
        since: DateTime<Utc>,
    ) -> Result<Option<VerificationSession>, DomainError> {
        self.fail_check()?;

        let sessions = self.sessions.lock().unwrap();
        Ok(sessions
            .values()
            .filter(|s| {
                s.phone == *phone && s.status == SessionStatus::Approved && s.updated_at >= since
            })
            .max_by_key(|s| s.updated_at)
            .cloned())
    }
}
