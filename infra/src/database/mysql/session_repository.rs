//! MySQL implementation of the verification session repository
//!
//! The supersede insert and the attempt increment run inside transactions;
//! the terminal transitions are single compare-and-set updates guarded by
//! `status = 'pending'`, so two callers racing the same session resolve to
//! one winner without application-side locking.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use tracing::debug;
use uuid::Uuid;

use cb_core::domain::entities::verification_session::{
    Channel, SessionStatus, VerificationSession,
};
use cb_core::errors::DomainError;
use cb_core::repositories::VerificationSessionRepository;
use cb_shared::types::PhoneNumber;

/// MySQL-backed verification session store
pub struct MySqlVerificationSessionRepository {
    pool: MySqlPool,
}

impl MySqlVerificationSessionRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VerificationSessionRepository for MySqlVerificationSessionRepository {
    async fn insert_superseding(&self, session: &VerificationSession) -> Result<u64, DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| DomainError::Internal {
            message: format!("Failed to begin session transaction: {}", e),
        })?;

        let expired = sqlx::query(
            r#"
            UPDATE verification_sessions
            SET status = 'expired', updated_at = ?
            WHERE phone = ? AND status = 'pending'
            "#,
        )
        .bind(session.created_at)
        .bind(session.phone.as_e164())
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::Internal {
            message: format!("Failed to expire prior sessions: {}", e),
        })?
        .rows_affected();

        sqlx::query(
            r#"
            INSERT INTO verification_sessions
                (id, phone, provider_ref, channel, status, attempts,
                 created_at, expires_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(session.id.to_string())
        .bind(session.phone.as_e164())
        .bind(&session.provider_ref)
        .bind(session.channel.as_str())
        .bind(session.status.as_str())
        .bind(session.attempts)
        .bind(session.created_at)
        .bind(session.expires_at)
        .bind(session.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::Internal {
            message: format!("Failed to insert session: {}", e),
        })?;

        tx.commit().await.map_err(|e| DomainError::Internal {
            message: format!("Failed to commit session insert: {}", e),
        })?;

        debug!(
            session_id = %session.id,
            phone = %session.phone.masked(),
            superseded = expired,
            "Verification session inserted"
        );

        Ok(expired)
    }

    async fn find_pending(
        &self,
        phone: &PhoneNumber,
    ) -> Result<Option<VerificationSession>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, phone, provider_ref, channel, status, attempts,
                   created_at, expires_at, updated_at
            FROM verification_sessions
            WHERE phone = ? AND status = 'pending'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(phone.as_e164())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::Internal {
            message: format!("Failed to find pending session: {}", e),
        })?;

        row.map(|r| row_to_session(&r)).transpose()
    }

    async fn transition_from_pending(
        &self,
        id: Uuid,
        to: SessionStatus,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE verification_sessions
            SET status = ?, updated_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(to.as_str())
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::Internal {
            message: format!("Failed to transition session: {}", e),
        })?;

        Ok(result.rows_affected() > 0)
    }

    async fn increment_attempts(&self, id: Uuid) -> Result<Option<u32>, DomainError> {
        // The row lock taken by the UPDATE holds until commit, so the
        // SELECT observes this increment and no concurrent one.
        let mut tx = self.pool.begin().await.map_err(|e| DomainError::Internal {
            message: format!("Failed to begin attempt transaction: {}", e),
        })?;

        let updated = sqlx::query(
            r#"
            UPDATE verification_sessions
            SET attempts = attempts + 1, updated_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::Internal {
            message: format!("Failed to increment attempts: {}", e),
        })?
        .rows_affected();

        if updated == 0 {
            // Session gone or no longer pending; nothing to count against
            return Ok(None);
        }

        let attempts: u32 = sqlx::query(
            r#"SELECT attempts FROM verification_sessions WHERE id = ?"#,
        )
        .bind(id.to_string())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| DomainError::Internal {
            message: format!("Failed to read attempt count: {}", e),
        })?
        .try_get("attempts")
        .map_err(|e| DomainError::Internal {
            message: format!("Failed to decode attempt count: {}", e),
        })?;

        tx.commit().await.map_err(|e| DomainError::Internal {
            message: format!("Failed to commit attempt increment: {}", e),
        })?;

        Ok(Some(attempts))
    }

    async fn find_approved_since(
        &self,
        phone: &PhoneNumber,
        since: DateTime<Utc>,
    ) -> Result<Option<VerificationSession>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, phone, provider_ref, channel, status, attempts,
                   created_at, expires_at, updated_at
            FROM verification_sessions
            WHERE phone = ? AND status = 'approved' AND updated_at >= ?
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
        )
        .bind(phone.as_e164())
        .bind(since)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::Internal {
            message: format!("Failed to find approved session: {}", e),
        })?;

        row.map(|r| row_to_session(&r)).transpose()
    }
}

/// Convert a database row into a VerificationSession entity
fn row_to_session(row: &MySqlRow) -> Result<VerificationSession, DomainError> {
    let id_raw: String = row.try_get("id").map_err(|e| DomainError::Internal {
        message: format!("Failed to get session id: {}", e),
    })?;
    let id = Uuid::parse_str(&id_raw).map_err(|e| DomainError::Internal {
        message: format!("Stored session id is not a UUID: {}", e),
    })?;

    let phone_raw: String = row.try_get("phone").map_err(|e| DomainError::Internal {
        message: format!("Failed to get session phone: {}", e),
    })?;
    let phone = PhoneNumber::try_from(phone_raw).map_err(|e| DomainError::Internal {
        message: format!("Stored session phone is not E.164: {}", e),
    })?;

    let provider_ref: String = row.try_get("provider_ref").map_err(|e| DomainError::Internal {
        message: format!("Failed to get provider_ref: {}", e),
    })?;

    let channel_raw: String = row.try_get("channel").map_err(|e| DomainError::Internal {
        message: format!("Failed to get session channel: {}", e),
    })?;
    let channel = Channel::from_str(&channel_raw).ok_or_else(|| DomainError::Internal {
        message: format!("Unknown session channel: {}", channel_raw),
    })?;

    let status_raw: String = row.try_get("status").map_err(|e| DomainError::Internal {
        message: format!("Failed to get session status: {}", e),
    })?;
    let status = SessionStatus::from_str(&status_raw).ok_or_else(|| DomainError::Internal {
        message: format!("Unknown session status: {}", status_raw),
    })?;

    let attempts: u32 = row.try_get("attempts").map_err(|e| DomainError::Internal {
        message: format!("Failed to get session attempts: {}", e),
    })?;

    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(|e| DomainError::Internal {
        message: format!("Failed to get created_at: {}", e),
    })?;
    let expires_at: DateTime<Utc> = row.try_get("expires_at").map_err(|e| DomainError::Internal {
        message: format!("Failed to get expires_at: {}", e),
    })?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(|e| DomainError::Internal {
        message: format!("Failed to get updated_at: {}", e),
    })?;

    Ok(VerificationSession {
        id,
        phone,
        provider_ref,
        channel,
        status,
        attempts,
        created_at,
        expires_at,
        updated_at,
    })
}
