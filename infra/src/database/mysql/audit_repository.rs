//! MySQL implementation of the append-only audit log

use async_trait::async_trait;
use sqlx::MySqlPool;

use cb_core::domain::entities::audit::AuditRecord;
use cb_core::errors::DomainError;
use cb_core::repositories::AuditLogRepository;

/// MySQL-backed audit sink; rows are inserted and never updated
pub struct MySqlAuditLogRepository {
    pool: MySqlPool,
}

impl MySqlAuditLogRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLogRepository for MySqlAuditLogRepository {
    async fn append(&self, record: &AuditRecord) -> Result<(), DomainError> {
        // Structured payload travels as serialized JSON text
        let event_data = record.event_data.as_ref().map(|v| v.to_string());

        sqlx::query(
            r#"
            INSERT INTO audit_log
                (id, event_type, phone_masked, phone_hash, success,
                 detail, event_data, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.event_type.as_str())
        .bind(&record.phone_masked)
        .bind(&record.phone_hash)
        .bind(record.success)
        .bind(&record.detail)
        .bind(event_data)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::Internal {
            message: format!("Failed to append audit record: {}", e),
        })?;

        Ok(())
    }
}
