//! In-memory ledger for transfer service tests

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Mutex;

use cb_shared::types::PhoneNumber;

use crate::domain::entities::transfer_request::TransferRequest;
use crate::services::transfer::{BalanceInfo, LedgerError, LedgerExecutor, LedgerReceipt};

/// Mock ledger that settles at most once per idempotency token
///
/// Mirrors the contract real backends must honor: replaying a settled
/// token returns the original receipt. Calls are counted separately from
/// settlements so tests can tell "called again" from "moved money again".
pub struct MockLedgerExecutor {
    balances: Mutex<HashMap<String, Decimal>>,
    receipts: Mutex<HashMap<String, LedgerReceipt>>,
    reject_reason: Mutex<Option<String>>,
    unavailable: Mutex<bool>,
    execute_calls: Mutex<u32>,
}

impl MockLedgerExecutor {
    pub fn new() -> Self {
        Self {
            balances: Mutex::new(HashMap::new()),
            receipts: Mutex::new(HashMap::new()),
            reject_reason: Mutex::new(None),
            unavailable: Mutex::new(false),
            execute_calls: Mutex::new(0),
        }
    }

    pub fn set_balance(&self, phone: &PhoneNumber, balance: Decimal) {
        self.balances
            .lock()
            .unwrap()
            .insert(phone.as_e164().to_string(), balance);
    }

    /// Make every new settlement fail with this rejection reason
    pub fn set_reject(&self, reason: &str) {
        *self.reject_reason.lock().unwrap() = Some(reason.to_string());
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }

    /// How many times `execute_transfer` was invoked
    pub fn execute_calls(&self) -> u32 {
        *self.execute_calls.lock().unwrap()
    }

    /// How many distinct tokens actually settled
    pub fn settled_count(&self) -> usize {
        self.receipts.lock().unwrap().len()
    }
}

impl Default for MockLedgerExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerExecutor for MockLedgerExecutor {
    async fn execute_transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<LedgerReceipt, LedgerError> {
        *self.execute_calls.lock().unwrap() += 1;

        if *self.unavailable.lock().unwrap() {
            return Err(LedgerError::Unavailable {
                reason: "simulated outage".to_string(),
            });
        }

        let mut receipts = self.receipts.lock().unwrap();
        // Token already settled: replay the original receipt
        if let Some(receipt) = receipts.get(&request.idempotency_token) {
            return Ok(receipt.clone());
        }

        if let Some(reason) = self.reject_reason.lock().unwrap().clone() {
            return Err(LedgerError::Rejected { reason });
        }

        let receipt = LedgerReceipt {
            reference: format!("LGR-{:06}", receipts.len() + 1),
            executed_at: Utc::now(),
        };
        receipts.insert(request.idempotency_token.clone(), receipt.clone());
        Ok(receipt)
    }

    async fn balance(&self, phone: &PhoneNumber) -> Result<BalanceInfo, LedgerError> {
        if *self.unavailable.lock().unwrap() {
            return Err(LedgerError::Unavailable {
                reason: "simulated outage".to_string(),
            });
        }
        let balance = self
            .balances
            .lock()
            .unwrap()
            .get(phone.as_e164())
            .copied()
            .unwrap_or(Decimal::ZERO);
        Ok(BalanceInfo {
            phone: phone.clone(),
            balance,
            currency: "MXN".to_string(),
        })
    }
}
