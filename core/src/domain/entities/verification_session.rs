//! Verification session entity for the challenge/response protocol
//!
//! A session represents one challenge/response cycle against the external
//! verification provider. The provider holds the one-time code; we only keep
//! the opaque reference it hands back, never the code itself.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cb_shared::types::PhoneNumber;

/// Minutes before a pending session expires (provider-defined window)
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 10;

/// Wrong codes tolerated within one session before it is denied
pub const DEFAULT_MAX_SESSION_ATTEMPTS: u32 = 3;

/// Lifecycle of a verification session.
///
/// `Pending` is the only mutable state; the three others are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Challenge dispatched, waiting for the code
    Pending,
    /// Code confirmed by the provider
    Approved,
    /// Attempt limit exhausted
    Denied,
    /// Timed out or superseded by a newer challenge
    Expired,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Approved => "approved",
            SessionStatus::Denied => "denied",
            SessionStatus::Expired => "expired",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SessionStatus::Pending),
            "approved" => Some(SessionStatus::Approved),
            "denied" => Some(SessionStatus::Denied),
            "expired" => Some(SessionStatus::Expired),
            _ => None,
        }
    }

    /// Terminal states are immutable
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Pending)
    }
}

/// Delivery channel for the one-time code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Whatsapp,
    Sms,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Whatsapp => "whatsapp",
            Channel::Sms => "sms",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "whatsapp" => Some(Channel::Whatsapp),
            "sms" => Some(Channel::Sms),
            _ => None,
        }
    }
}

impl Default for Channel {
    fn default() -> Self {
        Channel::Whatsapp
    }
}

/// One challenge/response cycle for an identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationSession {
    /// Unique session identifier
    pub id: Uuid,

    /// Identity the challenge was sent to
    pub phone: PhoneNumber,

    /// Opaque reference handed back by the provider
    pub provider_ref: String,

    /// Channel the code was dispatched over
    pub channel: Channel,

    /// Current lifecycle state
    pub status: SessionStatus,

    /// Wrong codes submitted so far
    pub attempts: u32,

    /// When the challenge was dispatched
    pub created_at: DateTime<Utc>,

    /// When the pending session stops being checkable
    pub expires_at: DateTime<Utc>,

    /// Last state change; for approved sessions this is the approval time
    pub updated_at: DateTime<Utc>,
}

impl VerificationSession {
    /// Create a new pending session for a freshly dispatched challenge
    pub fn new(
        phone: PhoneNumber,
        provider_ref: impl Into<String>,
        channel: Channel,
        ttl_minutes: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            phone,
            provider_ref: provider_ref.into(),
            channel,
            status: SessionStatus::Pending,
            attempts: 0,
            created_at: now,
            expires_at: now + Duration::minutes(ttl_minutes),
            updated_at: now,
        }
    }

    /// Whether the provider-defined window has elapsed
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_pending(&self) -> bool {
        self.status == SessionStatus::Pending
    }

    /// Attempts left before the session is denied
    pub fn remaining_attempts(&self, max_attempts: u32) -> u32 {
        max_attempts.saturating_sub(self.attempts)
    }

    /// Transition out of Pending. Returns false when the session is already
    /// terminal; terminal sessions are never re-validated.
    pub fn transition(&mut self, to: SessionStatus) -> bool {
        if self.status.is_terminal() || to == SessionStatus::Pending {
            return false;
        }
        self.status = to;
        self.updated_at = Utc::now();
        true
    }

    /// Count one wrong code. Returns the new attempt count, or None when the
    /// session is no longer pending.
    pub fn record_attempt(&mut self) -> Option<u32> {
        if !self.is_pending() {
            return None;
        }
        self.attempts += 1;
        self.updated_at = Utc::now();
        Some(self.attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phone() -> PhoneNumber {
        PhoneNumber::parse("+521234567890", "52").unwrap()
    }

    fn session() -> VerificationSession {
        VerificationSession::new(phone(), "VE-test", Channel::Whatsapp, 10)
    }

    #[test]
    fn new_session_is_pending_with_zero_attempts() {
        let s = session();
        assert_eq!(s.status, SessionStatus::Pending);
        assert_eq!(s.attempts, 0);
        assert!(s.is_pending());
        assert!(!s.is_expired(Utc::now()));
    }

    #[test]
    fn session_expires_after_ttl() {
        let s = session();
        let later = s.created_at + Duration::minutes(11);
        assert!(s.is_expired(later));
        assert!(s.is_expired(s.expires_at));
        assert!(!s.is_expired(s.expires_at - Duration::seconds(1)));
    }

    #[test]
    fn transition_leaves_pending_once() {
        let mut s = session();
        assert!(s.transition(SessionStatus::Approved));
        assert_eq!(s.status, SessionStatus::Approved);

        // Terminal sessions are immutable
        assert!(!s.transition(SessionStatus::Denied));
        assert_eq!(s.status, SessionStatus::Approved);
    }

    #[test]
    fn transition_back_to_pending_is_rejected() {
        let mut s = session();
        assert!(!s.transition(SessionStatus::Pending));
        assert_eq!(s.status, SessionStatus::Pending);
    }

    #[test]
    fn record_attempt_counts_only_while_pending() {
        let mut s = session();
        assert_eq!(s.record_attempt(), Some(1));
        assert_eq!(s.record_attempt(), Some(2));
        assert_eq!(s.remaining_attempts(3), 1);

        s.transition(SessionStatus::Denied);
        assert_eq!(s.record_attempt(), None);
        assert_eq!(s.attempts, 2);
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            SessionStatus::Pending,
            SessionStatus::Approved,
            SessionStatus::Denied,
            SessionStatus::Expired,
        ] {
            assert_eq!(SessionStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(SessionStatus::from_str("unknown"), None);
    }
}
