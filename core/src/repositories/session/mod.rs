//! Verification session repository module.

mod r#trait;
pub use r#trait::VerificationSessionRepository;

mod mock;
pub use mock::MockVerificationSessionRepository;
