//! Transfer endpoint shapes

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use cb_core::domain::entities::transfer_request::TransferRequest;

/// Body of `POST /api/v1/transfers`
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTransferRequest {
    /// Sender identity, E.164 or local digits
    #[validate(length(min = 8, max = 20, message = "phone must be 8-20 characters"))]
    pub phone: String,

    /// Destination account identifier (CLABE or card number)
    #[validate(length(min = 14, max = 20, message = "destination must be 14-20 digits"))]
    pub destination: String,

    pub amount: Decimal,

    /// ISO currency code; the configured default applies when omitted
    pub currency: Option<String>,

    #[validate(length(max = 120, message = "concept must be at most 120 characters"))]
    pub concept: Option<String>,

    /// Client-chosen token; resubmitting with the same token replays the
    /// stored outcome instead of paying twice
    #[validate(length(min = 1, max = 64, message = "idempotency_token must be 1-64 characters"))]
    pub idempotency_token: String,
}

/// Settled transfer as returned to REST callers
#[derive(Debug, Serialize)]
pub struct TransferReceiptResponse {
    pub request_id: Uuid,
    pub status: String,
    pub destination: String,
    pub amount: Decimal,
    pub currency: String,

    /// Ledger reference for the settled movement
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<DateTime<Utc>>,

    /// True when this response replays a previously stored outcome
    pub replayed: bool,
}

impl TransferReceiptResponse {
    pub fn executed(request: TransferRequest, replayed: bool) -> Self {
        Self {
            request_id: request.id,
            status: "executed".to_string(),
            destination: request.destination,
            amount: request.amount,
            currency: request.currency,
            reference: request.outcome_ref,
            executed_at: request.executed_at,
            replayed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_rejects_short_destination() {
        let request = CreateTransferRequest {
            phone: "+521234567890".to_string(),
            destination: "12345".to_string(),
            amount: Decimal::new(100_00, 2),
            currency: None,
            concept: None,
            idempotency_token: "tok-1".to_string(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_create_request_accepts_clabe_length_destination() {
        let request = CreateTransferRequest {
            phone: "+521234567890".to_string(),
            destination: "002010077777777771".to_string(),
            amount: Decimal::new(100_00, 2),
            currency: Some("MXN".to_string()),
            concept: Some("renta".to_string()),
            idempotency_token: "tok-1".to_string(),
        };
        assert!(request.validate().is_ok());
    }
}
