//! Audit record entity
//!
//! Append-only security and transaction trail. Records are immutable once
//! written and are never read back by the decision logic; reads are an
//! operational concern. Phone numbers are stored masked plus hashed, never
//! in the clear.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cb_shared::types::PhoneNumber;

/// Kinds of events the audit trail records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    ChallengeSent,
    ChallengeFailed,
    VerificationApproved,
    VerificationDenied,
    VerificationExpired,
    LockoutTriggered,
    LockoutCleared,
    RateLimitExceeded,
    SignatureRejected,
    TransferRecorded,
    TransferExecuted,
    TransferRejected,
    TransferReplayed,
    BalanceQueried,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::ChallengeSent => "challenge_sent",
            AuditEventType::ChallengeFailed => "challenge_failed",
            AuditEventType::VerificationApproved => "verification_approved",
            AuditEventType::VerificationDenied => "verification_denied",
            AuditEventType::VerificationExpired => "verification_expired",
            AuditEventType::LockoutTriggered => "lockout_triggered",
            AuditEventType::LockoutCleared => "lockout_cleared",
            AuditEventType::RateLimitExceeded => "rate_limit_exceeded",
            AuditEventType::SignatureRejected => "signature_rejected",
            AuditEventType::TransferRecorded => "transfer_recorded",
            AuditEventType::TransferExecuted => "transfer_executed",
            AuditEventType::TransferRejected => "transfer_rejected",
            AuditEventType::TransferReplayed => "transfer_replayed",
            AuditEventType::BalanceQueried => "balance_queried",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "challenge_sent" => Some(AuditEventType::ChallengeSent),
            "challenge_failed" => Some(AuditEventType::ChallengeFailed),
            "verification_approved" => Some(AuditEventType::VerificationApproved),
            "verification_denied" => Some(AuditEventType::VerificationDenied),
            "verification_expired" => Some(AuditEventType::VerificationExpired),
            "lockout_triggered" => Some(AuditEventType::LockoutTriggered),
            "lockout_cleared" => Some(AuditEventType::LockoutCleared),
            "rate_limit_exceeded" => Some(AuditEventType::RateLimitExceeded),
            "signature_rejected" => Some(AuditEventType::SignatureRejected),
            "transfer_recorded" => Some(AuditEventType::TransferRecorded),
            "transfer_executed" => Some(AuditEventType::TransferExecuted),
            "transfer_rejected" => Some(AuditEventType::TransferRejected),
            "transfer_replayed" => Some(AuditEventType::TransferReplayed),
            "balance_queried" => Some(AuditEventType::BalanceQueried),
            _ => None,
        }
    }
}

/// One immutable audit entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,

    pub event_type: AuditEventType,

    /// Masked identity (`****7890`); None for events with no parsed identity
    pub phone_masked: Option<String>,

    /// SHA-256 digest of the identity, for correlation without exposure
    pub phone_hash: Option<String>,

    /// Whether the underlying operation succeeded
    pub success: bool,

    /// Short human-readable detail, internal only
    pub detail: Option<String>,

    /// Structured payload for operational queries
    pub event_data: Option<serde_json::Value>,

    pub created_at: DateTime<Utc>,
}

impl AuditRecord {
    /// Create a record for an identified event
    pub fn new(event_type: AuditEventType, phone: &PhoneNumber) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            phone_masked: Some(phone.masked()),
            phone_hash: Some(phone.digest()),
            success: true,
            detail: None,
            event_data: None,
            created_at: Utc::now(),
        }
    }

    /// Create a record for an event with no parsed identity
    /// (e.g. a rejected signature before the sender field is trusted)
    pub fn anonymous(event_type: AuditEventType) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            phone_masked: None,
            phone_hash: None,
            success: false,
            detail: None,
            event_data: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_success(mut self, success: bool) -> Self {
        self.success = success;
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.event_data = Some(data);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_masks_and_hashes_the_phone() {
        let phone = PhoneNumber::parse("+521234567890", "52").unwrap();
        let record = AuditRecord::new(AuditEventType::ChallengeSent, &phone);

        assert_eq!(record.phone_masked.as_deref(), Some("****7890"));
        assert_eq!(record.phone_hash.as_deref(), Some(phone.digest().as_str()));
        assert!(record.success);
        assert!(!record
            .phone_hash
            .unwrap()
            .contains(phone.as_e164().trim_start_matches('+')));
    }

    #[test]
    fn anonymous_record_carries_no_identity() {
        let record = AuditRecord::anonymous(AuditEventType::SignatureRejected)
            .with_detail("bad signature header");
        assert!(record.phone_masked.is_none());
        assert!(record.phone_hash.is_none());
        assert!(!record.success);
        assert_eq!(record.detail.as_deref(), Some("bad signature header"));
    }

    #[test]
    fn builder_attaches_structured_data() {
        let phone = PhoneNumber::parse("+521234567890", "52").unwrap();
        let record = AuditRecord::new(AuditEventType::TransferExecuted, &phone)
            .with_data(serde_json::json!({ "token": "tok-1", "amount": "150.00" }));

        let data = record.event_data.unwrap();
        assert_eq!(data["token"], "tok-1");
    }

    #[test]
    fn event_type_round_trips_through_strings() {
        for event in [
            AuditEventType::ChallengeSent,
            AuditEventType::LockoutTriggered,
            AuditEventType::TransferReplayed,
            AuditEventType::BalanceQueried,
        ] {
            assert_eq!(AuditEventType::from_str(event.as_str()), Some(event));
        }
        assert_eq!(AuditEventType::from_str("login"), None);
    }
}
