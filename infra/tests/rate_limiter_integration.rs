//! Integration tests for the Redis-backed rate limiter
//!
//! ```bash
//! REDIS_URL=redis://localhost:6379 \
//!     cargo test -p cb_infra --test rate_limiter_integration -- --ignored
//! ```

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use cb_core::services::rate_limit::{OperationClass, RateLimitDecision, RateLimiterTrait};
    use cb_infra::cache::{RedisClient, RedisRateLimiter};
    use cb_shared::config::{CacheConfig, RateLimitConfig, WindowLimit};
    use cb_shared::types::PhoneNumber;

    fn random_phone() -> PhoneNumber {
        let digits = rand::random::<u32>() % 100_000_000;
        PhoneNumber::parse(&format!("+5255{:08}", digits), "52").unwrap()
    }

    fn tight_config() -> RateLimitConfig {
        RateLimitConfig {
            enabled: true,
            inbound: WindowLimit::new(3, 60),
            verify_send: WindowLimit::new(2, 60),
            verify_check: WindowLimit::new(5, 60),
        }
    }

    #[tokio::test]
    #[ignore] // Requires actual Redis server
    async fn budget_exhaustion_throttles_with_a_retry_hint() {
        let client = RedisClient::new(CacheConfig::from_env()).await.unwrap();
        let limiter = RedisRateLimiter::new(client, tight_config());
        let phone = random_phone();

        for _ in 0..3 {
            let decision = limiter
                .admit(&phone, OperationClass::InboundMessage, Utc::now())
                .await
                .unwrap();
            assert!(matches!(decision, RateLimitDecision::Admitted));
        }

        match limiter
            .admit(&phone, OperationClass::InboundMessage, Utc::now())
            .await
            .unwrap()
        {
            RateLimitDecision::Throttled {
                retry_after_seconds,
            } => {
                assert!(retry_after_seconds >= 1 && retry_after_seconds <= 60);
            }
            RateLimitDecision::Admitted => panic!("fourth request must be throttled"),
        }
    }

    #[tokio::test]
    #[ignore] // Requires actual Redis server
    async fn operation_classes_have_independent_budgets() {
        let client = RedisClient::new(CacheConfig::from_env()).await.unwrap();
        let limiter = RedisRateLimiter::new(client, tight_config());
        let phone = random_phone();

        for _ in 0..2 {
            limiter
                .admit(&phone, OperationClass::VerifySend, Utc::now())
                .await
                .unwrap();
        }
        let throttled = limiter
            .admit(&phone, OperationClass::VerifySend, Utc::now())
            .await
            .unwrap();
        assert!(matches!(throttled, RateLimitDecision::Throttled { .. }));

        // The check budget for the same identity is untouched
        let check = limiter
            .admit(&phone, OperationClass::VerifyCheck, Utc::now())
            .await
            .unwrap();
        assert!(matches!(check, RateLimitDecision::Admitted));
    }

    #[tokio::test]
    #[ignore] // Requires actual Redis server
    async fn identities_do_not_share_windows()  {
        let client = RedisClient::new(CacheConfig::from_env()).await.unwrap();
        let limiter = RedisRateLimiter::new(client, tight_config());

        let first = random_phone();
        let second = random_phone();

        for _ in 0..3 {
            limiter
                .admit(&first, OperationClass::InboundMessage, Utc::now())
                .await
                .unwrap();
        }
        let throttled = limiter
            .admit(&first, OperationClass::InboundMessage, Utc::now())
            .await
            .unwrap();
        assert!(matches!(throttled, RateLimitDecision::Throttled { .. }));

        let other = limiter
            .admit(&second, OperationClass::InboundMessage, Utc::now())
            .await
            .unwrap();
        assert!(matches!(other, RateLimitDecision::Admitted));
    }
}
