//! MySQL implementation of the lockout state repository
//!
//! `record_failure` takes a row lock (`SELECT ... FOR UPDATE`) before
//! applying the counter logic from the domain entity, so two concurrent
//! failures for one phone serialize and exactly one of them trips the
//! lock at the threshold.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use tracing::debug;

use cb_core::domain::entities::lockout::{LockoutPolicy, LockoutState};
use cb_core::errors::DomainError;
use cb_core::repositories::LockoutRepository;
use cb_shared::types::PhoneNumber;

/// MySQL-backed lockout counter store
pub struct MySqlLockoutRepository {
    pool: MySqlPool,
}

impl MySqlLockoutRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LockoutRepository for MySqlLockoutRepository {
    async fn record_failure(
        &self,
        phone: &PhoneNumber,
        now: DateTime<Utc>,
        policy: &LockoutPolicy,
    ) -> Result<LockoutState, DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| DomainError::Internal {
            message: format!("Failed to begin lockout transaction: {}", e),
        })?;

        let row = sqlx::query(
            r#"
            SELECT phone, failed_attempts, locked_until, updated_at
            FROM lockout_states
            WHERE phone = ?
            FOR UPDATE
            "#,
        )
        .bind(phone.as_e164())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| DomainError::Internal {
            message: format!("Failed to lock lockout row: {}", e),
        })?;

        let mut state = match row {
            Some(r) => row_to_state(&r)?,
            None => LockoutState::new(phone.clone()),
        };
        state.register_failure(now, policy);

        sqlx::query(
            r#"
            INSERT INTO lockout_states (phone, failed_attempts, locked_until, updated_at)
            VALUES (?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                failed_attempts = VALUES(failed_attempts),
                locked_until = VALUES(locked_until),
                updated_at = VALUES(updated_at)
            "#,
        )
        .bind(state.phone.as_e164())
        .bind(state.failed_attempts)
        .bind(state.locked_until)
        .bind(state.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::Internal {
            message: format!("Failed to store lockout state: {}", e),
        })?;

        tx.commit().await.map_err(|e| DomainError::Internal {
            message: format!("Failed to commit lockout update: {}", e),
        })?;

        if state.locked_until.is_some() {
            debug!(
                phone = %phone.masked(),
                failed_attempts = state.failed_attempts,
                "Lockout threshold reached"
            );
        }

        Ok(state)
    }

    async fn record_success(
        &self,
        phone: &PhoneNumber,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        // Absent row already means "no failures"; only reset what exists
        sqlx::query(
            r#"
            UPDATE lockout_states
            SET failed_attempts = 0, locked_until = NULL, updated_at = ?
            WHERE phone = ?
            "#,
        )
        .bind(now)
        .bind(phone.as_e164())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::Internal {
            message: format!("Failed to reset lockout state: {}", e),
        })?;

        Ok(())
    }

    async fn find(&self, phone: &PhoneNumber) -> Result<Option<LockoutState>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT phone, failed_attempts, locked_until, updated_at
            FROM lockout_states
            WHERE phone = ?
            "#,
        )
        .bind(phone.as_e164())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::Internal {
            message: format!("Failed to find lockout state: {}", e),
        })?;

        row.map(|r| row_to_state(&r)).transpose()
    }
}

/// Convert a database row into a LockoutState entity
fn row_to_state(row: &MySqlRow) -> Result<LockoutState, DomainError> {
    let phone_raw: String = row.try_get("phone").map_err(|e| DomainError::Internal {
        message: format!("Failed to get lockout phone: {}", e),
    })?;
    let phone = PhoneNumber::try_from(phone_raw).map_err(|e| DomainError::Internal {
        message: format!("Stored lockout phone is not E.164: {}", e),
    })?;

    let failed_attempts: u32 = row
        .try_get("failed_attempts")
        .map_err(|e| DomainError::Internal {
            message: format!("Failed to get failed_attempts: {}", e),
        })?;

    let locked_until: Option<DateTime<Utc>> =
        row.try_get("locked_until").map_err(|e| DomainError::Internal {
            message: format!("Failed to get locked_until: {}", e),
        })?;

    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(|e| DomainError::Internal {
        message: format!("Failed to get lockout updated_at: {}", e),
    })?;

    Ok(LockoutState {
        phone,
        failed_attempts,
        locked_until,
        updated_at,
    })
}
