//! Business services containing domain logic and use cases.

pub mod audit;
pub mod intent;
pub mod lockout;
pub mod rate_limit;
pub mod signature;
pub mod transfer;
pub mod verification;

// Re-export commonly used types
pub use audit::{AuditService, AuditServiceConfig};
pub use intent::{extract_confirmation_code, Intent, IntentParser, ParsedIntent, RuleIntentParser};
pub use lockout::{LockoutConfig, LockoutTracker};
pub use rate_limit::{InMemoryRateLimiter, OperationClass, RateLimitDecision, RateLimiterTrait};
pub use signature::{SignatureVerdict, WebhookSignatureValidator};
pub use transfer::{
    BalanceInfo, LedgerError, LedgerExecutor, LedgerReceipt, TransferOutcome, TransferService,
    TransferServiceConfig, TransferSubmission, TwoFactorGate,
};
pub use verification::{
    ChallengeProvider, CheckOutcome, ProviderChallenge, ProviderCheckStatus, ProviderError,
    StartChallengeResult, VerificationConfig, VerificationService,
};
