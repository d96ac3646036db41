//! Transfer gate and ledger backend configuration

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which ledger backend to construct at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerMode {
    /// Wallets and transactions in the local database
    Local,
    /// Remote bank API over HTTP with OAuth2 client credentials
    Http,
}

impl Default for LedgerMode {
    fn default() -> Self {
        LedgerMode::Local
    }
}

impl std::str::FromStr for LedgerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(LedgerMode::Local),
            "http" | "remote" => Ok(LedgerMode::Http),
            _ => Err(format!("Invalid ledger mode: {}", s)),
        }
    }
}

/// Remote ledger connection settings (http mode only)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LedgerConfig {
    /// Backend selection
    #[serde(default)]
    pub mode: LedgerMode,

    /// Base URL of the remote bank API
    #[serde(default)]
    pub base_url: String,

    /// OAuth2 token endpoint
    #[serde(default)]
    pub oauth_token_url: String,

    /// OAuth2 client id
    #[serde(default)]
    pub client_id: String,

    /// OAuth2 client secret
    #[serde(default)]
    pub client_secret: String,

    /// Request timeout in seconds
    #[serde(default = "default_ledger_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            mode: LedgerMode::default(),
            base_url: String::new(),
            oauth_token_url: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            request_timeout_seconds: default_ledger_timeout(),
        }
    }
}

/// Two-factor gate thresholds and ledger selection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransferConfig {
    /// Transfers at or above this amount require verification
    #[serde(default = "default_two_factor_threshold")]
    pub two_factor_threshold: Decimal,

    /// How recent an Approved verification must be to satisfy the gate
    #[serde(default = "default_recency")]
    pub verification_recency_minutes: i64,

    /// Currency code applied when requests omit one
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Ledger backend settings
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Seed a demo wallet at startup (development only)
    #[serde(default)]
    pub demo_seed: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            two_factor_threshold: default_two_factor_threshold(),
            verification_recency_minutes: default_recency(),
            currency: default_currency(),
            ledger: LedgerConfig::default(),
            demo_seed: false,
        }
    }
}

impl TransferConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let two_factor_threshold = std::env::var("TRANSFER_2FA_THRESHOLD")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_two_factor_threshold);
        let verification_recency_minutes = std::env::var("VERIFICATION_RECENCY_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_recency);
        let mode = std::env::var("BANK_CLIENT_MODE")
            .unwrap_or_else(|_| "local".to_string())
            .parse()
            .unwrap_or_default();

        Self {
            two_factor_threshold,
            verification_recency_minutes,
            currency: std::env::var("WALLET_CURRENCY").unwrap_or_else(|_| default_currency()),
            ledger: LedgerConfig {
                mode,
                base_url: std::env::var("BANK_API_BASE_URL").unwrap_or_default(),
                oauth_token_url: std::env::var("BANK_OAUTH_TOKEN_URL").unwrap_or_default(),
                client_id: std::env::var("BANK_CLIENT_ID").unwrap_or_default(),
                client_secret: std::env::var("BANK_CLIENT_SECRET").unwrap_or_default(),
                request_timeout_seconds: std::env::var("BANK_REQUEST_TIMEOUT_SECONDS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or_else(default_ledger_timeout),
            },
            demo_seed: std::env::var("DEMO_SEED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        }
    }
}

fn default_two_factor_threshold() -> Decimal {
    Decimal::new(1000_00, 2) // 1000.00
}

fn default_recency() -> i64 {
    10
}

fn default_currency() -> String {
    String::from("MXN")
}

fn default_ledger_timeout() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_mode_parses_from_string() {
        assert_eq!("local".parse::<LedgerMode>().unwrap(), LedgerMode::Local);
        assert_eq!("HTTP".parse::<LedgerMode>().unwrap(), LedgerMode::Http);
        assert_eq!("remote".parse::<LedgerMode>().unwrap(), LedgerMode::Http);
        assert!("abacus".parse::<LedgerMode>().is_err());
    }

    #[test]
    fn defaults_match_policy() {
        let config = TransferConfig::default();
        assert_eq!(config.two_factor_threshold, Decimal::new(1000_00, 2));
        assert_eq!(config.verification_recency_minutes, 10);
        assert_eq!(config.currency, "MXN");
        assert_eq!(config.ledger.mode, LedgerMode::Local);
    }
}
