//! Fixed-window rate limiting per identity and operation class
//!
//! Every admission decision is keyed by `(identity, operation class)`:
//! inbound webhook messages budget separately from challenge sends and code
//! checks, so a chatty conversation cannot starve verification and vice
//! versa. Windows are fixed, anchored at the first request observed after
//! the prior window lapsed, matching the Redis-backed implementation in the
//! infrastructure crate.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use cb_shared::config::{RateLimitConfig, WindowLimit};
use cb_shared::types::PhoneNumber;

use crate::errors::DomainResult;

/// Operation classes with independent rate budgets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationClass {
    /// One inbound conversational message
    InboundMessage,
    /// Dispatching a verification challenge
    VerifySend,
    /// Checking a verification code
    VerifyCheck,
}

impl OperationClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationClass::InboundMessage => "inbound",
            OperationClass::VerifySend => "verify_send",
            OperationClass::VerifyCheck => "verify_check",
        }
    }
}

/// Outcome of one admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Request is within budget and has been counted
    Admitted,
    /// Budget exhausted for the current window
    Throttled { retry_after_seconds: u64 },
}

impl RateLimitDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, RateLimitDecision::Admitted)
    }
}

/// Rate limiting service trait for admission control
///
/// `admit` both checks and counts: an admitted request consumes one slot
/// of the window budget, a throttled one consumes nothing.
#[async_trait]
pub trait RateLimiterTrait: Send + Sync {
    /// Decide whether one request from `phone` in `class` may proceed at `now`
    async fn admit(
        &self,
        phone: &PhoneNumber,
        class: OperationClass,
        now: DateTime<Utc>,
    ) -> DomainResult<RateLimitDecision>;
}

#[derive(Debug, Clone, Copy)]
struct WindowSlot {
    window_start: DateTime<Utc>,
    count: u32,
}

/// In-process fixed-window limiter
///
/// Backs single-node deployments and every test; multi-node deployments
/// use the Redis implementation in the infrastructure crate, which shares
/// the same window semantics.
pub struct InMemoryRateLimiter {
    config: RateLimitConfig,
    slots: Mutex<HashMap<(String, OperationClass), WindowSlot>>,
}

impl InMemoryRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn limit_for(&self, class: OperationClass) -> WindowLimit {
        match class {
            OperationClass::InboundMessage => self.config.inbound,
            OperationClass::VerifySend => self.config.verify_send,
            OperationClass::VerifyCheck => self.config.verify_check,
        }
    }
}

#[async_trait]
impl RateLimiterTrait for InMemoryRateLimiter {
    async fn admit(
        &self,
        phone: &PhoneNumber,
        class: OperationClass,
        now: DateTime<Utc>,
    ) -> DomainResult<RateLimitDecision> {
        if !self.config.enabled {
            return Ok(RateLimitDecision::Admitted);
        }

        let limit = self.limit_for(class);
        let window = Duration::seconds(limit.window_seconds as i64);
        let key = (phone.as_e164().to_string(), class);

        let mut slots = self.slots.lock().unwrap();
        let slot = slots.entry(key).or_insert(WindowSlot {
            window_start: now,
            count: 0,
        });

        // Lazy window rollover: the first request after expiry opens a new one
        if now >= slot.window_start + window {
            slot.window_start = now;
            slot.count = 0;
        }

        if slot.count >= limit.max_requests {
            let reset_at = slot.window_start + window;
            let retry_after = (reset_at - now).num_seconds().max(1) as u64;
            return Ok(RateLimitDecision::Throttled {
                retry_after_seconds: retry_after,
            });
        }

        slot.count += 1;
        Ok(RateLimitDecision::Admitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phone() -> PhoneNumber {
        PhoneNumber::parse("+521234567890", "52").unwrap()
    }

    fn limiter(max: u32, window_seconds: u64) -> InMemoryRateLimiter {
        let mut config = RateLimitConfig::default();
        config.enabled = true;
        config.inbound = WindowLimit::new(max, window_seconds);
        config.verify_send = WindowLimit::new(max, window_seconds);
        config.verify_check = WindowLimit::new(max, window_seconds);
        InMemoryRateLimiter::new(config)
    }

    #[tokio::test]
    async fn admits_up_to_the_window_budget() {
        let limiter = limiter(3, 60);
        let now = Utc::now();

        for _ in 0..3 {
            let decision = limiter
                .admit(&phone(), OperationClass::InboundMessage, now)
                .await
                .unwrap();
            assert!(decision.is_admitted());
        }

        match limiter
            .admit(&phone(), OperationClass::InboundMessage, now)
            .await
            .unwrap()
        {
            RateLimitDecision::Throttled {
                retry_after_seconds,
            } => assert!(retry_after_seconds >= 1 && retry_after_seconds <= 60),
            RateLimitDecision::Admitted => panic!("fourth request must be throttled"),
        }
    }

    #[tokio::test]
    async fn window_expiry_opens_fresh_budget() {
        let limiter = limiter(2, 60);
        let start = Utc::now();

        for _ in 0..2 {
            limiter
                .admit(&phone(), OperationClass::VerifySend, start)
                .await
                .unwrap();
        }
        assert!(!limiter
            .admit(&phone(), OperationClass::VerifySend, start)
            .await
            .unwrap()
            .is_admitted());

        let later = start + Duration::seconds(61);
        assert!(limiter
            .admit(&phone(), OperationClass::VerifySend, later)
            .await
            .unwrap()
            .is_admitted());
    }

    #[tokio::test]
    async fn classes_budget_independently() {
        let limiter = limiter(1, 60);
        let now = Utc::now();

        assert!(limiter
            .admit(&phone(), OperationClass::InboundMessage, now)
            .await
            .unwrap()
            .is_admitted());
        assert!(!limiter
            .admit(&phone(), OperationClass::InboundMessage, now)
            .await
            .unwrap()
            .is_admitted());

        // Exhausting inbound leaves the verify budgets untouched
        assert!(limiter
            .admit(&phone(), OperationClass::VerifySend, now)
            .await
            .unwrap()
            .is_admitted());
        assert!(limiter
            .admit(&phone(), OperationClass::VerifyCheck, now)
            .await
            .unwrap()
            .is_admitted());
    }

    #[tokio::test]
    async fn identities_budget_independently() {
        let limiter = limiter(1, 60);
        let now = Utc::now();
        let other = PhoneNumber::parse("+525555555555", "52").unwrap();

        assert!(limiter
            .admit(&phone(), OperationClass::InboundMessage, now)
            .await
            .unwrap()
            .is_admitted());
        assert!(limiter
            .admit(&other, OperationClass::InboundMessage, now)
            .await
            .unwrap()
            .is_admitted());
    }

    #[tokio::test]
    async fn disabled_limiter_admits_everything() {
        let mut config = RateLimitConfig::default();
        config.enabled = false;
        config.inbound = WindowLimit::new(0, 60);
        let limiter = InMemoryRateLimiter::new(config);

        for _ in 0..10 {
            assert!(limiter
                .admit(&phone(), OperationClass::InboundMessage, Utc::now())
                .await
                .unwrap()
                .is_admitted());
        }
    }
}
