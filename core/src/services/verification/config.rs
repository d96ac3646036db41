//! Configuration for the verification orchestrator

use cb_shared::config::VerifyConfig;

use crate::domain::entities::verification_session::{
    DEFAULT_MAX_SESSION_ATTEMPTS, DEFAULT_SESSION_TTL_MINUTES,
};

/// Tunables for the verification flow
#[derive(Debug, Clone, Copy)]
pub struct VerificationConfig {
    /// Minutes a pending session stays answerable
    pub session_ttl_minutes: i64,

    /// Wrong codes allowed per session before it is denied
    pub max_session_attempts: u32,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            session_ttl_minutes: DEFAULT_SESSION_TTL_MINUTES,
            max_session_attempts: DEFAULT_MAX_SESSION_ATTEMPTS,
        }
    }
}

impl From<&VerifyConfig> for VerificationConfig {
    fn from(config: &VerifyConfig) -> Self {
        Self {
            session_ttl_minutes: config.session_ttl_minutes,
            max_session_attempts: config.max_session_attempts,
        }
    }
}
