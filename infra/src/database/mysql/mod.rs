//! MySQL implementations of the `cb_core` repository ports
//!
//! Every repository holds a clone of the shared pool and speaks plain SQL.
//! State transitions are compare-and-swap updates guarded by the current
//! status column, so concurrent writers settle on exactly one winner.

pub mod audit_repository;
pub mod lockout_repository;
pub mod session_repository;
pub mod transfer_repository;

pub use audit_repository::MySqlAuditLogRepository;
pub use lockout_repository::MySqlLockoutRepository;
pub use session_repository::MySqlVerificationSessionRepository;
pub use transfer_repository::MySqlTransferRepository;
