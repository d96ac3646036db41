//! MySQL implementation of the transfer request repository
//!
//! The `(phone, idempotency_token)` unique index does the heavy lifting:
//! `record` simply inserts and treats a duplicate-key rejection as "the
//! row already exists", then returns the stored row. Finalization is a
//! compare-and-set on the status column.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use tracing::debug;
use uuid::Uuid;

use cb_core::domain::entities::transfer_request::{TransferRequest, TransferStatus};
use cb_core::errors::DomainError;
use cb_core::repositories::{RecordOutcome, TransferRepository};
use cb_shared::types::PhoneNumber;

const SELECT_COLUMNS: &str = r#"
    SELECT id, phone, destination, amount, currency, concept,
           idempotency_token, status, outcome_ref, reject_reason,
           created_at, executed_at
    FROM transfer_requests
"#;

/// MySQL-backed transfer request store
pub struct MySqlTransferRepository {
    pool: MySqlPool,
}

impl MySqlTransferRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn fetch_by_token(
        &self,
        phone: &PhoneNumber,
        token: &str,
    ) -> Result<Option<TransferRequest>, DomainError> {
        let query = format!("{} WHERE phone = ? AND idempotency_token = ?", SELECT_COLUMNS);
        let row = sqlx::query(&query)
            .bind(phone.as_e164())
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::Internal {
                message: format!("Failed to find transfer by token: {}", e),
            })?;

        row.map(|r| row_to_transfer(&r)).transpose()
    }
}

#[async_trait]
impl TransferRepository for MySqlTransferRepository {
    async fn record(&self, request: &TransferRequest) -> Result<RecordOutcome, DomainError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO transfer_requests
                (id, phone, destination, amount, currency, concept,
                 idempotency_token, status, outcome_ref, reject_reason,
                 created_at, executed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(request.id.to_string())
        .bind(request.phone.as_e164())
        .bind(&request.destination)
        .bind(request.amount)
        .bind(&request.currency)
        .bind(&request.concept)
        .bind(&request.idempotency_token)
        .bind(request.status.as_str())
        .bind(&request.outcome_ref)
        .bind(&request.reject_reason)
        .bind(request.created_at)
        .bind(request.executed_at)
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => {
                debug!(
                    request_id = %request.id,
                    phone = %request.phone.masked(),
                    "Transfer request recorded"
                );
                Ok(RecordOutcome::Created)
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                let existing = self
                    .fetch_by_token(&request.phone, &request.idempotency_token)
                    .await?
                    .ok_or_else(|| DomainError::Internal {
                        message: "Duplicate transfer insert but stored row not found".to_string(),
                    })?;
                Ok(RecordOutcome::Existing(existing))
            }
            Err(e) => Err(DomainError::Internal {
                message: format!("Failed to record transfer: {}", e),
            }),
        }
    }

    async fn find_by_token(
        &self,
        phone: &PhoneNumber,
        token: &str,
    ) -> Result<Option<TransferRequest>, DomainError> {
        self.fetch_by_token(phone, token).await
    }

    async fn mark_executed(
        &self,
        id: Uuid,
        outcome_ref: &str,
        executed_at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE transfer_requests
            SET status = 'executed', outcome_ref = ?, executed_at = ?
            WHERE id = ? AND status = 'recorded'
            "#,
        )
        .bind(outcome_ref)
        .bind(executed_at)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::Internal {
            message: format!("Failed to mark transfer executed: {}", e),
        })?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_rejected(&self, id: Uuid, reason: &str) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE transfer_requests
            SET status = 'rejected', reject_reason = ?
            WHERE id = ? AND status = 'recorded'
            "#,
        )
        .bind(reason)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::Internal {
            message: format!("Failed to mark transfer rejected: {}", e),
        })?;

        Ok(result.rows_affected() > 0)
    }

    async fn promote_to_recorded(&self, id: Uuid) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE transfer_requests
            SET status = 'recorded'
            WHERE id = ? AND status = 'requires_verification'
            "#,
        )
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::Internal {
            message: format!("Failed to promote transfer: {}", e),
        })?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_oldest_awaiting(
        &self,
        phone: &PhoneNumber,
    ) -> Result<Option<TransferRequest>, DomainError> {
        let query = format!(
            "{} WHERE phone = ? AND status = 'requires_verification' ORDER BY created_at ASC LIMIT 1",
            SELECT_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(phone.as_e164())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::Internal {
                message: format!("Failed to find awaiting transfer: {}", e),
            })?;

        row.map(|r| row_to_transfer(&r)).transpose()
    }
}

/// Convert a database row into a TransferRequest entity
fn row_to_transfer(row: &MySqlRow) -> Result<TransferRequest, DomainError> {
    let id_raw: String = row.try_get("id").map_err(|e| DomainError::Internal {
        message: format!("Failed to get transfer id: {}", e),
    })?;
    let id = Uuid::parse_str(&id_raw).map_err(|e| DomainError::Internal {
        message: format!("Stored transfer id is not a UUID: {}", e),
    })?;

    let phone_raw: String = row.try_get("phone").map_err(|e| DomainError::Internal {
        message: format!("Failed to get transfer phone: {}", e),
    })?;
    let phone = PhoneNumber::try_from(phone_raw).map_err(|e| DomainError::Internal {
        message: format!("Stored transfer phone is not E.164: {}", e),
    })?;

    let destination: String = row.try_get("destination").map_err(|e| DomainError::Internal {
        message: format!("Failed to get destination: {}", e),
    })?;

    let amount: Decimal = row.try_get("amount").map_err(|e| DomainError::Internal {
        message: format!("Failed to get amount: {}", e),
    })?;

    let currency: String = row.try_get("currency").map_err(|e| DomainError::Internal {
        message: format!("Failed to get currency: {}", e),
    })?;

    let concept: Option<String> = row.try_get("concept").map_err(|e| DomainError::Internal {
        message: format!("Failed to get concept: {}", e),
    })?;

    let idempotency_token: String =
        row.try_get("idempotency_token")
            .map_err(|e| DomainError::Internal {
                message: format!("Failed to get idempotency_token: {}", e),
            })?;

    let status_raw: String = row.try_get("status").map_err(|e| DomainError::Internal {
        message: format!("Failed to get transfer status: {}", e),
    })?;
    let status = TransferStatus::from_str(&status_raw).ok_or_else(|| DomainError::Internal {
        message: format!("Unknown transfer status: {}", status_raw),
    })?;

    let outcome_ref: Option<String> =
        row.try_get("outcome_ref").map_err(|e| DomainError::Internal {
            message: format!("Failed to get outcome_ref: {}", e),
        })?;

    let reject_reason: Option<String> =
        row.try_get("reject_reason")
            .map_err(|e| DomainError::Internal {
                message: format!("Failed to get reject_reason: {}", e),
            })?;

    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(|e| DomainError::Internal {
        message: format!("Failed to get transfer created_at: {}", e),
    })?;

    let executed_at: Option<DateTime<Utc>> =
        row.try_get("executed_at").map_err(|e| DomainError::Internal {
            message: format!("Failed to get executed_at: {}", e),
        })?;

    Ok(TransferRequest {
        id,
        phone,
        destination,
        amount,
        currency,
        concept,
        idempotency_token,
        status,
        outcome_ref,
        reject_reason,
        created_at,
        executed_at,
    })
}
