//! Lockout state entity
//!
//! Tracks consecutive verification failures per identity and the cooldown
//! window once the threshold is hit. The state survives across verification
//! sessions and expires lazily: nothing sweeps stale locks, a check simply
//! ignores a lock whose deadline has passed.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use cb_shared::types::PhoneNumber;

/// Thresholds applied when registering failures
#[derive(Debug, Clone, Copy)]
pub struct LockoutPolicy {
    /// Consecutive failures before the identity is locked
    pub max_failures: u32,

    /// How long the lock holds
    pub cooldown: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_failures: 5,
            cooldown: Duration::minutes(5),
        }
    }
}

/// Per-identity failure counter with optional lock deadline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockoutState {
    pub phone: PhoneNumber,

    /// Consecutive failed verification attempts
    pub failed_attempts: u32,

    /// Set once `failed_attempts` reaches the policy maximum
    pub locked_until: Option<DateTime<Utc>>,

    pub updated_at: DateTime<Utc>,
}

impl LockoutState {
    pub fn new(phone: PhoneNumber) -> Self {
        Self {
            phone,
            failed_attempts: 0,
            locked_until: None,
            updated_at: Utc::now(),
        }
    }

    /// Whether the identity is locked at `now`
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.map_or(false, |until| now < until)
    }

    /// Seconds until the lock expires, zero when not locked
    pub fn remaining_lock_seconds(&self, now: DateTime<Utc>) -> u64 {
        match self.locked_until {
            Some(until) if now < until => (until - now).num_seconds().max(0) as u64,
            _ => 0,
        }
    }

    /// Register one failure and apply the policy.
    ///
    /// A failure that arrives after an earlier lock already expired starts a
    /// fresh count instead of stacking on the stale one.
    pub fn register_failure(&mut self, now: DateTime<Utc>, policy: &LockoutPolicy) {
        if self.locked_until.map_or(false, |until| now >= until) {
            self.failed_attempts = 0;
            self.locked_until = None;
        }

        self.failed_attempts += 1;
        if self.failed_attempts >= policy.max_failures {
            self.locked_until = Some(now + policy.cooldown);
        }
        self.updated_at = now;
    }

    /// Clear failures and any lock after a successful verification
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.failed_attempts = 0;
        self.locked_until = None;
        self.updated_at = now;
    }
}
