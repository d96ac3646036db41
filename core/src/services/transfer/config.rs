//! Configuration for the transfer service

use rust_decimal::Decimal;

use cb_shared::config::TransferConfig;

/// Seconds a `Recorded` row is trusted to still be in flight; older rows
/// found by a duplicate submission are treated as abandoned and re-driven
pub const DEFAULT_EXECUTION_GRACE_SECONDS: i64 = 60;

/// Tunables for the transfer flow
#[derive(Debug, Clone)]
pub struct TransferServiceConfig {
    /// Transfers at or above this amount require verification
    pub two_factor_threshold: Decimal,

    /// How recent an Approved verification must be to satisfy the gate
    pub verification_recency_minutes: i64,

    /// Currency applied when a submission omits one
    pub default_currency: String,

    /// In-flight window for duplicate-submission handling
    pub execution_grace_seconds: i64,
}

impl Default for TransferServiceConfig {
    fn default() -> Self {
        Self {
            two_factor_threshold: Decimal::new(1000_00, 2),
            verification_recency_minutes: 10,
            default_currency: String::from("MXN"),
            execution_grace_seconds: DEFAULT_EXECUTION_GRACE_SECONDS,
        }
    }
}

impl From<&TransferConfig> for TransferServiceConfig {
    fn from(config: &TransferConfig) -> Self {
        Self {
            two_factor_threshold: config.two_factor_threshold,
            verification_recency_minutes: config.verification_recency_minutes,
            default_currency: config.currency.clone(),
            execution_grace_seconds: DEFAULT_EXECUTION_GRACE_SECONDS,
        }
    }
}
