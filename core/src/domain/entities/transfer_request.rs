//! Transfer request entity
//!
//! A transfer request is the durable idempotency record for one
//! money-movement attempt. The pair (identity, idempotency token) is unique;
//! the store enforces it, so a replayed submission finds the original record
//! instead of executing again.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cb_shared::types::PhoneNumber;
use cb_shared::utils::validation;

use crate::errors::ValidationError;

/// Lifecycle of a transfer request.
///
/// `Recorded` marks an execution in flight (record-then-execute);
/// `RequiresVerification` parks a conversational request until its identity
/// confirms a challenge; `Executed` and `Rejected` are terminal and replayed
/// as-is on duplicate submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Recorded,
    RequiresVerification,
    Executed,
    Rejected,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Recorded => "recorded",
            TransferStatus::RequiresVerification => "requires_verification",
            TransferStatus::Executed => "executed",
            TransferStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "recorded" => Some(TransferStatus::Recorded),
            "requires_verification" => Some(TransferStatus::RequiresVerification),
            "executed" => Some(TransferStatus::Executed),
            "rejected" => Some(TransferStatus::Rejected),
            _ => None,
        }
    }

    /// Settled requests never change again
    pub fn is_settled(&self) -> bool {
        matches!(self, TransferStatus::Executed | TransferStatus::Rejected)
    }
}

/// One money-movement request, keyed by (identity, idempotency token)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub id: Uuid,

    /// Requesting identity
    pub phone: PhoneNumber,

    /// Destination account identifier (CLABE-style digit run)
    pub destination: String,

    /// Positive fixed-precision amount
    pub amount: Decimal,

    /// ISO currency code
    pub currency: String,

    /// Free-text concept shown on the ledger entry
    pub concept: Option<String>,

    /// Caller-supplied token guaranteeing at-most-once execution
    pub idempotency_token: String,

    pub status: TransferStatus,

    /// Ledger receipt reference, set when executed
    pub outcome_ref: Option<String>,

    /// Ledger rejection reason, set when rejected
    pub reject_reason: Option<String>,

    pub created_at: DateTime<Utc>,

    pub executed_at: Option<DateTime<Utc>>,
}

impl TransferRequest {
    /// Build a request in `Recorded` state, validating its fields
    pub fn recorded(
        phone: PhoneNumber,
        destination: impl Into<String>,
        amount: Decimal,
        currency: impl Into<String>,
        concept: Option<String>,
        idempotency_token: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        Self::build(
            phone,
            destination,
            amount,
            currency,
            concept,
            idempotency_token,
            TransferStatus::Recorded,
        )
    }

    /// Build a parked request awaiting challenge confirmation
    pub fn awaiting_verification(
        phone: PhoneNumber,
        destination: impl Into<String>,
        amount: Decimal,
        currency: impl Into<String>,
        concept: Option<String>,
        idempotency_token: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        Self::build(
            phone,
            destination,
            amount,
            currency,
            concept,
            idempotency_token,
            TransferStatus::RequiresVerification,
        )
    }

    fn build(
        phone: PhoneNumber,
        destination: impl Into<String>,
        amount: Decimal,
        currency: impl Into<String>,
        concept: Option<String>,
        idempotency_token: impl Into<String>,
        status: TransferStatus,
    ) -> Result<Self, ValidationError> {
        let destination = destination.into();
        let idempotency_token = idempotency_token.into();

        if amount <= Decimal::ZERO {
            return Err(ValidationError::InvalidAmount {
                amount: amount.to_string(),
            });
        }
        if !validation::is_valid_account(&destination) {
            return Err(ValidationError::InvalidAccount {
                account: destination,
            });
        }
        if idempotency_token.trim().is_empty() {
            return Err(ValidationError::RequiredField {
                field: "idempotency_token".to_string(),
            });
        }

        Ok(Self {
            id: Uuid::new_v4(),
            phone,
            destination,
            amount,
            currency: currency.into(),
            concept,
            idempotency_token,
            status,
            outcome_ref: None,
            reject_reason: None,
            created_at: Utc::now(),
            executed_at: None,
        })
    }

    pub fn is_settled(&self) -> bool {
        self.status.is_settled()
    }
}
