//! Verification provider and lockout policy configuration

use serde::{Deserialize, Serialize};

/// Which challenge provider backend to construct at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyMode {
    /// Twilio Verify v2 REST API
    Twilio,
    /// In-process mock accepting a fixed code (development and tests)
    Mock,
}

impl Default for VerifyMode {
    fn default() -> Self {
        VerifyMode::Mock
    }
}

impl std::str::FromStr for VerifyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "twilio" => Ok(VerifyMode::Twilio),
            "mock" | "local" => Ok(VerifyMode::Mock),
            _ => Err(format!("Invalid verify mode: {}", s)),
        }
    }
}

/// Verification provider credentials and challenge/lockout policy
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VerifyConfig {
    /// Provider backend selection
    #[serde(default)]
    pub mode: VerifyMode,

    /// Twilio account SID (required in twilio mode)
    #[serde(default)]
    pub account_sid: String,

    /// Twilio auth token (required in twilio mode)
    #[serde(default)]
    pub auth_token: String,

    /// Twilio Verify service SID (required in twilio mode)
    #[serde(default)]
    pub verify_service_sid: String,

    /// Fixed code accepted by the mock backend
    #[serde(default = "default_mock_code")]
    pub mock_accept_code: String,

    /// Minutes before a pending session expires (provider-defined window)
    #[serde(default = "default_session_ttl")]
    pub session_ttl_minutes: i64,

    /// Wrong codes tolerated within one session before it is denied
    #[serde(default = "default_max_session_attempts")]
    pub max_session_attempts: u32,

    /// Consecutive failures before the identity is locked out
    #[serde(default = "default_lockout_max_failures")]
    pub lockout_max_failures: u32,

    /// Lockout cooldown in minutes
    #[serde(default = "default_lockout_cooldown")]
    pub lockout_cooldown_minutes: i64,

    /// Country code prepended to bare national numbers
    #[serde(default = "default_country_code")]
    pub default_country_code: String,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            mode: VerifyMode::default(),
            account_sid: String::new(),
            auth_token: String::new(),
            verify_service_sid: String::new(),
            mock_accept_code: default_mock_code(),
            session_ttl_minutes: default_session_ttl(),
            max_session_attempts: default_max_session_attempts(),
            lockout_max_failures: default_lockout_max_failures(),
            lockout_cooldown_minutes: default_lockout_cooldown(),
            default_country_code: default_country_code(),
        }
    }
}

impl VerifyConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let mode = std::env::var("VERIFY_MODE")
            .unwrap_or_else(|_| "mock".to_string())
            .parse()
            .unwrap_or_default();

        Self {
            mode,
            account_sid: std::env::var("TWILIO_ACCOUNT_SID").unwrap_or_default(),
            auth_token: std::env::var("TWILIO_AUTH_TOKEN").unwrap_or_default(),
            verify_service_sid: std::env::var("TWILIO_VERIFY_SERVICE_SID").unwrap_or_default(),
            mock_accept_code: std::env::var("VERIFY_MOCK_CODE")
                .unwrap_or_else(|_| default_mock_code()),
            session_ttl_minutes: env_i64("VERIFY_SESSION_TTL_MINUTES", default_session_ttl()),
            max_session_attempts: env_u32(
                "VERIFY_MAX_SESSION_ATTEMPTS",
                default_max_session_attempts(),
            ),
            lockout_max_failures: env_u32("OTP_MAX_ATTEMPTS", default_lockout_max_failures()),
            lockout_cooldown_minutes: env_i64("OTP_LOCK_MINUTES", default_lockout_cooldown()),
            default_country_code: std::env::var("DEFAULT_COUNTRY_CODE")
                .unwrap_or_else(|_| default_country_code()),
        }
    }

    /// Whether the twilio credentials are present
    pub fn has_twilio_credentials(&self) -> bool {
        !self.account_sid.is_empty()
            && !self.auth_token.is_empty()
            && !self.verify_service_sid.is_empty()
    }
}

fn env_i64(name: &str, default: i64) -> i64 {
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

fn default_mock_code() -> String {
    String::from("123456")
}

fn default_session_ttl() -> i64 {
    10
}

fn default_max_session_attempts() -> u32 {
    3
}

fn default_lockout_max_failures() -> u32 {
    5
}

fn default_lockout_cooldown() -> i64 {
    5
}

fn default_country_code() -> String {
    String::from("52")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parses_from_string() {
        assert_eq!("twilio".parse::<VerifyMode>().unwrap(), VerifyMode::Twilio);
        assert_eq!("MOCK".parse::<VerifyMode>().unwrap(), VerifyMode::Mock);
        assert_eq!("local".parse::<VerifyMode>().unwrap(), VerifyMode::Mock);
        assert!("carrier-pigeon".parse::<VerifyMode>().is_err());
    }

    #[test]
    fn defaults_match_policy() {
        let config = VerifyConfig::default();
        assert_eq!(config.mode, VerifyMode::Mock);
        assert_eq!(config.session_ttl_minutes, 10);
        assert_eq!(config.max_session_attempts, 3);
        assert_eq!(config.lockout_max_failures, 5);
        assert_eq!(config.lockout_cooldown_minutes, 5);
        assert!(!config.has_twilio_credentials());
    }
}
