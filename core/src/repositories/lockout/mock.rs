//! Mock implementation of LockoutRepository for testing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use cb_shared::types::PhoneNumber;

use crate::domain::entities::lockout::{LockoutPolicy, LockoutState};
use crate::errors::DomainError;

use super::LockoutRepository;

/// Mock implementation of LockoutRepository for testing
pub struct MockLockoutRepository {
    states: Arc<Mutex<HashMap<String, LockoutState>>>,
    should_fail: Arc<Mutex<bool>>,
}

impl MockLockoutRepository {
    /// Create a new mock repository
    pub fn new() -> Self {
        Self {
            states: Arc::new(Mutex::new(HashMap::new())),
            should_fail: Arc::new(Mutex::new(false)),
        }
    }

    /// Set whether operations should fail
    pub fn set_should_fail(&self, should_fail: bool) {
        *self.should_fail.lock().unwrap() = should_fail;
    }

    /// Seed a state directly for tests that need pre-existing locks
    pub fn insert_raw(&self, state: LockoutState) {
        self.states
            .lock()
            .unwrap()
            .insert(state.phone.as_e164().to_string(), state);
    }

    /// Fetch a state by phone for assertions
    pub fn get(&self, phone: &PhoneNumber) -> Option<LockoutState> {
        self.states.lock().unwrap().get(phone.as_e164()).cloned()
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

impl Default for MockLockoutRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LockoutRepository for MockLockoutRepository {
    async fn record_failure(
        &self,
        phone: &PhoneNumber,
        now: DateTime<Utc>,
        policy: &LockoutPolicy,
    ) -> Result<LockoutState, DomainError> {
        self.fail_check()?;

        let mut states = self.states.lock().unwrap();
        let state = states
            .entry(phone.as_e164().to_string())
            .or_insert_with(|| LockoutState::new(phone.clone()));
        state.register_failure(now, policy);
        Ok(state.clone())
    }

    async fn record_success(
        &self,
        phone: &PhoneNumber,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.fail_check()?;

        let mut states = self.states.lock().unwrap();
        if let Some(state) = states.get_mut(phone.as_e164()) {
            state.reset(now);
        }
        Ok(())
    }

    async fn find(&self, phone: &PhoneNumber) -> Result<Option<LockoutState>, DomainError> {
        self.fail_check()?;

        let states = self.states.lock().unwrap();
        Ok(states.get(phone.as_e164()).cloned())
    }
}
