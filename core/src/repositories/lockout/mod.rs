//! Lockout state repository module.

mod r#trait;
pub use r#trait::LockoutRepository;

mod mock;
pub use mock::MockLockoutRepository;
