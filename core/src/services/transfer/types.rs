//! Submission and outcome types for the transfer flow

use rust_decimal::Decimal;

use cb_shared::types::PhoneNumber;

use crate::domain::entities::transfer_request::TransferRequest;

/// One transfer submission, from any surface (REST or conversational)
#[derive(Debug, Clone)]
pub struct TransferSubmission {
    pub phone: PhoneNumber,

    /// Destination account identifier
    pub destination: String,

    pub amount: Decimal,

    /// Falls back to the configured default currency when omitted
    pub currency: Option<String>,

    pub concept: Option<String>,

    /// Caller-supplied token; the same token always maps to the same outcome
    pub idempotency_token: String,
}

/// Settled outcome of a submission
///
/// `replayed` distinguishes "this call executed it" from "a prior call did
/// and this one returned the stored result". Both branches are terminal:
/// a rejected token is never retried automatically.
#[derive(Debug, Clone)]
pub enum TransferOutcome {
    Executed {
        request: TransferRequest,
        replayed: bool,
    },
    Rejected {
        request: TransferRequest,
        reason: String,
        replayed: bool,
    },
}

impl TransferOutcome {
    pub fn request(&self) -> &TransferRequest {
        match self {
            TransferOutcome::Executed { request, .. } => request,
            TransferOutcome::Rejected { request, .. } => request,
        }
    }

    pub fn is_replayed(&self) -> bool {
        match self {
            TransferOutcome::Executed { replayed, .. } => *replayed,
            TransferOutcome::Rejected { replayed, .. } => *replayed,
        }
    }

    pub fn is_executed(&self) -> bool {
        matches!(self, TransferOutcome::Executed { .. })
    }
}
