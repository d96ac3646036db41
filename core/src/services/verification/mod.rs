//! Verification flow: challenge dispatch, code checking and session state
//!
//! The orchestrator in [`service`] owns the `Pending → Approved | Denied |
//! Expired` state machine; the provider boundary is the [`ChallengeProvider`]
//! trait with implementations in the infrastructure layer.

mod config;
mod service;
mod traits;
mod types;

#[cfg(test)]
mod tests;

pub use config::VerificationConfig;
pub use service::VerificationService;
pub use traits::{ChallengeProvider, ProviderChallenge, ProviderCheckStatus, ProviderError};
pub use types::{CheckOutcome, StartChallengeResult};
