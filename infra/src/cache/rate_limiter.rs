//! Redis-backed fixed-window rate limiter
//!
//! Distributed counterpart of the in-memory limiter in `cb_core`: one
//! counter per `(operation class, identity)` pair, created by the first
//! request of a window and expired by Redis itself. Every server instance
//! sharing the Redis sees the same budget.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use cb_core::errors::DomainResult;
use cb_core::services::rate_limit::{OperationClass, RateLimitDecision, RateLimiterTrait};
use cb_shared::config::{RateLimitConfig, WindowLimit};
use cb_shared::types::PhoneNumber;

use crate::cache::redis_client::RedisClient;
use crate::InfrastructureError;

/// Fixed-window limiter over Redis counters
pub struct RedisRateLimiter {
    client: RedisClient,
    config: RateLimitConfig,
}

impl RedisRateLimiter {
    pub fn new(client: RedisClient, config: RateLimitConfig) -> Self {
        Self { client, config }
    }

    fn limit_for(&self, class: OperationClass) -> WindowLimit {
        match class {
            OperationClass::InboundMessage => self.config.inbound,
            OperationClass::VerifySend => self.config.verify_send,
            OperationClass::VerifyCheck => self.config.verify_check,
        }
    }

    /// Counter key; the digest keeps raw identities out of Redis
    fn window_key(phone: &PhoneNumber, class: OperationClass) -> String {
        format!("rate:{}:{}", class.as_str(), phone.digest())
    }

    /// Admission when Redis cannot answer
    ///
    /// No counter means no verdict, and a request without a verdict is let
    /// through: the MySQL-backed lockout still guards code guessing, so a
    /// cache outage degrades throttling without taking the flows down.
    fn admit_on_outage(
        phone: &PhoneNumber,
        class: OperationClass,
        error: &InfrastructureError,
    ) -> RateLimitDecision {
        warn!(
            phone = %phone.masked(),
            class = class.as_str(),
            error = %error,
            "Rate limit backend unreachable, admitting request"
        );
        RateLimitDecision::Admitted
    }
}

#[async_trait]
impl RateLimiterTrait for RedisRateLimiter {
    async fn admit(
        &self,
        phone: &PhoneNumber,
        class: OperationClass,
        _now: DateTime<Utc>,
    ) -> DomainResult<RateLimitDecision> {
        if !self.config.enabled {
            return Ok(RateLimitDecision::Admitted);
        }

        let limit = self.limit_for(class);
        let key = Self::window_key(phone, class);

        // The caller's timestamp only matters to the in-memory limiter;
        // here Redis owns the clock through key expiry.
        let count = match self.client.increment(&key, Some(limit.window_seconds)).await {
            Ok(count) => count,
            Err(error) => return Ok(Self::admit_on_outage(phone, class, &error)),
        };

        if count > limit.max_requests as i64 {
            // The verdict is already in; a failed TTL read only degrades
            // the retry hint, it does not reopen the budget.
            let retry_after_seconds = match self.client.ttl(&key).await {
                Ok(Some(ttl)) => ttl.max(1) as u64,
                Ok(None) => {
                    // Counter lost its expiry (crash between INCR and
                    // EXPIRE); re-arm it so the window can end
                    if let Err(error) = self.client.expire(&key, limit.window_seconds).await {
                        warn!(
                            class = class.as_str(),
                            error = %error,
                            "Rate limit expiry repair failed"
                        );
                    }
                    limit.window_seconds
                }
                Err(error) => {
                    warn!(
                        class = class.as_str(),
                        error = %error,
                        "Rate limit TTL read failed"
                    );
                    limit.window_seconds
                }
            };

            debug!(
                phone = %phone.masked(),
                class = class.as_str(),
                count,
                "Request throttled"
            );

            return Ok(RateLimitDecision::Throttled {
                retry_after_seconds,
            });
        }

        Ok(RateLimitDecision::Admitted)
    }
}
