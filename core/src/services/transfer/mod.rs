//! Transfer flow: two-factor gating, idempotent execution and the ledger
//! boundary
//!
//! [`TransferService`] implements record-then-execute over the
//! [`LedgerExecutor`] trait; [`TwoFactorGate`] decides when a submission
//! must wait for verification first.

mod config;
mod service;
mod traits;
mod types;

#[cfg(test)]
mod tests;

pub use config::{TransferServiceConfig, DEFAULT_EXECUTION_GRACE_SECONDS};
pub use service::{TransferService, TwoFactorGate};
pub use traits::{BalanceInfo, LedgerError, LedgerExecutor, LedgerReceipt};
pub use types::{TransferOutcome, TransferSubmission};
