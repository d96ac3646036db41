//! Repository traits and in-memory test doubles.
//!
//! Concrete persistence lives in the infrastructure crate; this module
//! only defines the contracts the services program against, plus mocks
//! the whole workspace can test with.

pub mod audit;
pub mod lockout;
pub mod session;
pub mod transfer;

pub use audit::{AuditLogRepository, MockAuditLogRepository, NoOpAuditLogRepository};
pub use lockout::{LockoutRepository, MockLockoutRepository};
pub use session::{MockVerificationSessionRepository, VerificationSessionRepository};
pub use transfer::{MockTransferRepository, RecordOutcome, TransferRepository};
