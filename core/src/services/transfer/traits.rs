//! Ledger executor abstraction
//!
//! The ledger is the collaborator that actually moves money: a local
//! wallet table in demo deployments, a bank API over HTTP in real ones.
//! It must accept the caller-supplied idempotency token so that replaying
//! an execution is safe at this boundary too.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use cb_shared::types::PhoneNumber;

use crate::domain::entities::transfer_request::TransferRequest;

/// Receipt handed back when a transfer settles on the ledger
#[derive(Debug, Clone)]
pub struct LedgerReceipt {
    /// Ledger-side reference for the settled movement
    pub reference: String,

    /// When the ledger settled it
    pub executed_at: DateTime<Utc>,
}

/// Balance snapshot for one wallet
#[derive(Debug, Clone, Serialize)]
pub struct BalanceInfo {
    pub phone: PhoneNumber,
    pub balance: Decimal,
    pub currency: String,
}

/// Errors at the ledger boundary
#[derive(Error, Debug, Clone)]
pub enum LedgerError {
    /// The ledger evaluated the transfer and refused it (a verdict:
    /// insufficient funds, blocked destination). Terminal for the token.
    #[error("ledger rejected the transfer: {reason}")]
    Rejected { reason: String },

    /// No verdict: transport failure, timeout or a 5xx. The transfer may
    /// be retried later with the same token.
    #[error("ledger unavailable: {reason}")]
    Unavailable { reason: String },
}

/// External ledger that settles transfers and reports balances
///
/// `execute_transfer` must be idempotent on `request.idempotency_token`:
/// replaying a settled token returns the original receipt instead of
/// moving money twice.
#[async_trait]
pub trait LedgerExecutor: Send + Sync {
    /// Settle one transfer request
    async fn execute_transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<LedgerReceipt, LedgerError>;

    /// Current balance for an identity's wallet
    async fn balance(&self, phone: &PhoneNumber) -> Result<BalanceInfo, LedgerError>;
}
