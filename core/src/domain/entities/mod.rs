//! Domain entities representing core business objects.

pub mod audit;
pub mod lockout;
pub mod transfer_request;
pub mod verification_session;

// Re-export commonly used types
pub use audit::{AuditEventType, AuditRecord};
pub use lockout::{LockoutPolicy, LockoutState};
pub use transfer_request::{TransferRequest, TransferStatus};
pub use verification_session::{
    Channel, SessionStatus, VerificationSession, DEFAULT_MAX_SESSION_ATTEMPTS,
    DEFAULT_SESSION_TTL_MINUTES,
};
