//! Local database ledger
//!
//! Settles transfers against a `wallets` table in the same MySQL instance.
//! Each settlement is one transaction: lock the wallet row, check funds,
//! debit, insert the movement. The `(wallet_phone, client_token)` unique
//! index makes replays observable, so a token that already settled hands
//! back its original receipt instead of debiting again.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{MySqlPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use cb_core::domain::entities::transfer_request::TransferRequest;
use cb_core::services::transfer::{BalanceInfo, LedgerError, LedgerExecutor, LedgerReceipt};
use cb_shared::types::PhoneNumber;

use crate::InfrastructureError;

/// Wallet-table ledger for demo and development deployments
pub struct LocalLedger {
    pool: MySqlPool,
    default_currency: String,
}

impl LocalLedger {
    pub fn new(pool: MySqlPool, default_currency: String) -> Self {
        Self {
            pool,
            default_currency,
        }
    }

    /// Create a wallet with an opening balance unless one already exists
    ///
    /// Used by development bootstrap to provision the demo wallet; an
    /// existing wallet is left untouched across restarts.
    pub async fn seed_wallet(
        &self,
        phone: &PhoneNumber,
        opening_balance: Decimal,
    ) -> Result<(), InfrastructureError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT IGNORE INTO wallets (phone, balance, currency, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(phone.as_e164())
        .bind(opening_balance)
        .bind(&self.default_currency)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            info!(
                phone = %phone.masked(),
                balance = %opening_balance,
                "Wallet seeded"
            );
        }

        Ok(())
    }

    /// Look up an already-settled movement for a token
    async fn find_settled(
        &self,
        phone: &PhoneNumber,
        token: &str,
    ) -> Result<Option<LedgerReceipt>, LedgerError> {
        let row = sqlx::query(
            r#"
            SELECT id, created_at FROM ledger_transactions
            WHERE wallet_phone = ? AND client_token = ?
            "#,
        )
        .bind(phone.as_e164())
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LedgerError::Unavailable {
            reason: format!("replay lookup failed: {}", e),
        })?;

        match row {
            Some(r) => {
                let reference: String = r.try_get("id").map_err(|e| LedgerError::Unavailable {
                    reason: format!("replay row decode failed: {}", e),
                })?;
                let executed_at: DateTime<Utc> =
                    r.try_get("created_at").map_err(|e| LedgerError::Unavailable {
                        reason: format!("replay row decode failed: {}", e),
                    })?;
                Ok(Some(LedgerReceipt {
                    reference,
                    executed_at,
                }))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl LedgerExecutor for LocalLedger {
    async fn execute_transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<LedgerReceipt, LedgerError> {
        // Replay: this token already moved money once
        if let Some(receipt) = self
            .find_settled(&request.phone, &request.idempotency_token)
            .await?
        {
            debug!(
                phone = %request.phone.masked(),
                reference = %receipt.reference,
                "Settled token replayed"
            );
            return Ok(receipt);
        }

        let mut tx = self.pool.begin().await.map_err(|e| LedgerError::Unavailable {
            reason: format!("ledger transaction begin failed: {}", e),
        })?;

        let wallet = sqlx::query(
            r#"SELECT balance, currency FROM wallets WHERE phone = ? FOR UPDATE"#,
        )
        .bind(request.phone.as_e164())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| LedgerError::Unavailable {
            reason: format!("wallet lock failed: {}", e),
        })?;

        let (balance, currency) = match wallet {
            Some(row) => {
                let balance: Decimal =
                    row.try_get("balance").map_err(|e| LedgerError::Unavailable {
                        reason: format!("wallet row decode failed: {}", e),
                    })?;
                let currency: String =
                    row.try_get("currency").map_err(|e| LedgerError::Unavailable {
                        reason: format!("wallet row decode failed: {}", e),
                    })?;
                (balance, currency)
            }
            None => {
                return Err(LedgerError::Rejected {
                    reason: "no wallet for this identity".to_string(),
                })
            }
        };

        if currency != request.currency {
            return Err(LedgerError::Rejected {
                reason: format!(
                    "wallet holds {}, transfer asked for {}",
                    currency, request.currency
                ),
            });
        }

        if balance < request.amount {
            return Err(LedgerError::Rejected {
                reason: "insufficient funds".to_string(),
            });
        }

        let executed_at = Utc::now();

        sqlx::query(
            r#"UPDATE wallets SET balance = balance - ?, updated_at = ? WHERE phone = ?"#,
        )
        .bind(request.amount)
        .bind(executed_at)
        .bind(request.phone.as_e164())
        .execute(&mut *tx)
        .await
        .map_err(|e| LedgerError::Unavailable {
            reason: format!("wallet debit failed: {}", e),
        })?;

        let movement_id = Uuid::new_v4();
        let inserted = sqlx::query(
            r#"
            INSERT INTO ledger_transactions
                (id, wallet_phone, destination, amount, currency,
                 concept, client_token, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(movement_id.to_string())
        .bind(request.phone.as_e164())
        .bind(&request.destination)
        .bind(request.amount)
        .bind(&request.currency)
        .bind(&request.concept)
        .bind(&request.idempotency_token)
        .bind("completed")
        .bind(executed_at)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                // A concurrent call settled the same token first; drop our
                // transaction and hand back its receipt
                drop(tx);
                return self
                    .find_settled(&request.phone, &request.idempotency_token)
                    .await?
                    .ok_or_else(|| LedgerError::Unavailable {
                        reason: "duplicate settle raced but movement not found".to_string(),
                    });
            }
            Err(e) => {
                return Err(LedgerError::Unavailable {
                    reason: format!("movement insert failed: {}", e),
                })
            }
        }

        tx.commit().await.map_err(|e| LedgerError::Unavailable {
            reason: format!("ledger commit failed: {}", e),
        })?;

        debug!(
            phone = %request.phone.masked(),
            reference = %movement_id,
            amount = %request.amount,
            "Transfer settled"
        );

        Ok(LedgerReceipt {
            reference: movement_id.to_string(),
            executed_at,
        })
    }

    async fn balance(&self, phone: &PhoneNumber) -> Result<BalanceInfo, LedgerError> {
        let row = sqlx::query(r#"SELECT balance, currency FROM wallets WHERE phone = ?"#)
            .bind(phone.as_e164())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| LedgerError::Unavailable {
                reason: format!("balance lookup failed: {}", e),
            })?;

        match row {
            Some(r) => {
                let balance: Decimal =
                    r.try_get("balance").map_err(|e| LedgerError::Unavailable {
                        reason: format!("wallet row decode failed: {}", e),
                    })?;
                let currency: String =
                    r.try_get("currency").map_err(|e| LedgerError::Unavailable {
                        reason: format!("wallet row decode failed: {}", e),
                    })?;
                Ok(BalanceInfo {
                    phone: phone.clone(),
                    balance,
                    currency,
                })
            }
            // An identity with no wallet simply has nothing in it yet
            None => Ok(BalanceInfo {
                phone: phone.clone(),
                balance: Decimal::ZERO,
                currency: self.default_currency.clone(),
            }),
        }
    }
}
