//! Ledger backends that settle transfers
//!
//! Same closed-enum shape as the verification backends: the deployment
//! picks local wallets or the remote bank API once at startup.

pub mod http;
pub mod local;

pub use http::HttpLedger;
pub use local::LocalLedger;

use async_trait::async_trait;
use sqlx::MySqlPool;
use tracing::info;

use cb_core::services::transfer::{BalanceInfo, LedgerError, LedgerExecutor, LedgerReceipt};
use cb_core::domain::entities::transfer_request::TransferRequest;
use cb_shared::config::{LedgerMode, TransferConfig};
use cb_shared::types::PhoneNumber;

use crate::InfrastructureError;

/// Ledger backend selected at construction
pub enum LedgerBackend {
    Local(LocalLedger),
    Http(HttpLedger),
}

impl LedgerBackend {
    /// Build the backend the configuration names
    ///
    /// The pool is only used in local mode; http mode talks to the bank
    /// API and never touches the wallet tables.
    pub fn from_config(
        config: &TransferConfig,
        pool: MySqlPool,
    ) -> Result<Self, InfrastructureError> {
        match config.ledger.mode {
            LedgerMode::Local => {
                info!("Ledger backend: local wallets");
                Ok(LedgerBackend::Local(LocalLedger::new(
                    pool,
                    config.currency.clone(),
                )))
            }
            LedgerMode::Http => {
                let client = HttpLedger::new(&config.ledger)?;
                info!("Ledger backend: remote bank API");
                Ok(LedgerBackend::Http(client))
            }
        }
    }
}

#[async_trait]
impl LedgerExecutor for LedgerBackend {
    async fn execute_transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<LedgerReceipt, LedgerError> {
        match self {
            LedgerBackend::Local(ledger) => ledger.execute_transfer(request).await,
            LedgerBackend::Http(ledger) => ledger.execute_transfer(request).await,
        }
    }

    async fn balance(&self, phone: &PhoneNumber) -> Result<BalanceInfo, LedgerError> {
        match self {
            LedgerBackend::Local(ledger) => ledger.balance(phone).await,
            LedgerBackend::Http(ledger) => ledger.balance(phone).await,
        }
    }
}
