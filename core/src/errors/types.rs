//! Domain-specific error types for verification and transfer operations
//!
//! This module provides error type definitions for the verification lifecycle,
//! transfer execution and input validation. User-facing messages (Spanish for
//! the WhatsApp channel) are rendered in the presentation layer; these variants
//! carry the data that rendering needs.

use thiserror::Error;

// Re-export shared ErrorResponse so callers can depend on core alone
pub use cb_shared::types::response::ErrorResponse as DomainErrorResponse;

/// Verification lifecycle errors
///
/// These cover everything between "challenge requested" and a terminal
/// session state. A wrong code is not an error (the check returns a retry
/// outcome); `ProviderUnavailable` is one, and it must never consume
/// attempts or trip the lockout counters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Rate limit exceeded, retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Identity locked, retry after {retry_after_seconds}s")]
    Locked { retry_after_seconds: u64 },

    #[error("Verification provider unavailable")]
    ProviderUnavailable,

    #[error("Verification session expired")]
    SessionExpired,

    #[error("No pending verification session")]
    SessionNotPending,
}

/// Transfer execution errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("Verification required before transfer")]
    VerificationRequired,

    #[error("An identical submission is already in progress")]
    InProgress,

    #[error("Transfer rejected: {reason}")]
    ExecutionRejected { reason: String },

    #[error("Ledger backend unavailable")]
    LedgerUnavailable,
}

/// Input validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field: {field}")]
    RequiredField { field: String },

    #[error("Invalid phone number: {phone}")]
    InvalidPhone { phone: String },

    #[error("Invalid destination account: {account}")]
    InvalidAccount { account: String },

    #[error("Invalid amount: {amount}")]
    InvalidAmount { amount: String },

    #[error("Invalid format: {field}")]
    InvalidFormat { field: String },
}
