//! Result types for the verification flow

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Returned when a challenge was dispatched and a pending session created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartChallengeResult {
    /// Our session identifier
    pub session_id: Uuid,

    /// Provider-side reference for the challenge
    pub provider_ref: String,

    /// When the pending session lapses
    pub expires_at: DateTime<Utc>,

    /// Whether a prior pending session was expired to make room
    pub superseded_previous: bool,
}

/// Outcome of checking a submitted code
///
/// These are flow outcomes, not errors: a wrong code with attempts left is a
/// normal turn of the conversation. Hard failures (locked, expired, no
/// session) surface as errors instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckOutcome {
    /// The code matched; the session is now Approved
    Approved,
    /// Attempts are exhausted; the session is now Denied
    Denied,
    /// The code did not match but the session is still open
    Retry { remaining_attempts: u32 },
}

impl CheckOutcome {
    pub fn is_approved(&self) -> bool {
        matches!(self, CheckOutcome::Approved)
    }
}
