//! Rate limiting configuration module
//!
//! Each limited operation class gets its own independent fixed window. The
//! window definitions live here; enforcement lives in the core rate limiter
//! and its Redis-backed implementation.

use serde::{Deserialize, Serialize};

/// A fixed counting window: at most `max_requests` per `window_seconds`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct WindowLimit {
    /// Maximum admitted requests per window
    pub max_requests: u32,

    /// Window length in seconds
    pub window_seconds: u64,
}

impl WindowLimit {
    pub fn new(max_requests: u32, window_seconds: u64) -> Self {
        Self {
            max_requests,
            window_seconds,
        }
    }
}

/// Rate limiting configuration for all operation classes
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Master switch; disabled skips all rate checks (tests, local debugging)
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Inbound webhook messages per phone number
    #[serde(default = "default_inbound")]
    pub inbound: WindowLimit,

    /// Verification challenge dispatches per phone number
    #[serde(default = "default_verify_send")]
    pub verify_send: WindowLimit,

    /// Verification code checks per phone number
    #[serde(default = "default_verify_check")]
    pub verify_check: WindowLimit,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            inbound: default_inbound(),
            verify_send: default_verify_send(),
            verify_check: default_verify_check(),
        }
    }
}

impl RateLimitConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        Self {
            enabled: env_flag("RATE_LIMIT_ENABLED", default_enabled()),
            inbound: WindowLimit::new(
                env_u32("RATE_LIMIT_INBOUND_MAX", default_inbound().max_requests),
                env_u64("RATE_LIMIT_INBOUND_WINDOW_SECONDS", default_inbound().window_seconds),
            ),
            verify_send: WindowLimit::new(
                env_u32("RATE_LIMIT_VERIFY_SEND_MAX", default_verify_send().max_requests),
                env_u64(
                    "RATE_LIMIT_VERIFY_SEND_WINDOW_SECONDS",
                    default_verify_send().window_seconds,
                ),
            ),
            verify_check: WindowLimit::new(
                env_u32("RATE_LIMIT_VERIFY_CHECK_MAX", default_verify_check().max_requests),
                env_u64(
                    "RATE_LIMIT_VERIFY_CHECK_WINDOW_SECONDS",
                    default_verify_check().window_seconds,
                ),
            ),
        }
    }

    /// Relaxed limits for local development
    pub fn development() -> Self {
        Self {
            enabled: true,
            inbound: WindowLimit::new(120, 60),
            verify_send: WindowLimit::new(30, 60),
            verify_check: WindowLimit::new(30, 60),
        }
    }

    /// Strict limits for production
    pub fn production() -> Self {
        Self::default()
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(name: &str, default: u32) -> u32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn default_enabled() -> bool {
    true
}

fn default_inbound() -> WindowLimit {
    WindowLimit::new(30, 60)
}

fn default_verify_send() -> WindowLimit {
    WindowLimit::new(10, 60)
}

fn default_verify_check() -> WindowLimit {
    WindowLimit::new(10, 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits_match_policy() {
        let config = RateLimitConfig::default();
        assert!(config.enabled);
        assert_eq!(config.inbound, WindowLimit::new(30, 60));
        assert_eq!(config.verify_send, WindowLimit::new(10, 60));
        assert_eq!(config.verify_check, WindowLimit::new(10, 60));
    }

    #[test]
    fn development_limits_are_looser_than_production() {
        let dev = RateLimitConfig::development();
        let prod = RateLimitConfig::production();
        assert!(dev.inbound.max_requests > prod.inbound.max_requests);
        assert!(dev.verify_send.max_requests > prod.verify_send.max_requests);
    }
}
