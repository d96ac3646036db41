//! Audit service for recording security and transaction events
//!
//! Writes are strictly best-effort: the primary flow has already made its
//! decision by the time a record is emitted, and a broken audit sink must
//! never turn a successful verification or transfer into an error. Failed
//! appends are logged and dropped.

use std::sync::Arc;
use tokio::task;

use crate::domain::entities::audit::AuditRecord;
use crate::repositories::AuditLogRepository;

/// Configuration for the audit service
#[derive(Debug, Clone, Copy)]
pub struct AuditServiceConfig {
    /// Whether to run audit writes asynchronously
    pub async_writes: bool,
}

impl Default for AuditServiceConfig {
    fn default() -> Self {
        Self { async_writes: true }
    }
}

/// Service for appending records to the audit trail
pub struct AuditService<R>
where
    R: AuditLogRepository,
{
    repository: Arc<R>,
    config: AuditServiceConfig,
}

impl<R> AuditService<R>
where
    R: AuditLogRepository + 'static,
{
    /// Create a new audit service
    pub fn new(repository: Arc<R>, config: AuditServiceConfig) -> Self {
        Self { repository, config }
    }

    /// Append one record to the trail
    ///
    /// With `async_writes` the append runs in a background task; either way
    /// a failure is logged and swallowed, never propagated.
    pub async fn record(&self, record: AuditRecord) {
        if self.config.async_writes {
            let repository = Arc::clone(&self.repository);
            task::spawn(async move {
                if let Err(e) = repository.append(&record).await {
                    tracing::error!(
                        event = record.event_type.as_str(),
                        error = %e,
                        "failed to write audit record"
                    );
                }
            });
        } else if let Err(e) = self.repository.append(&record).await {
            tracing::error!(
                event = record.event_type.as_str(),
                error = %e,
                "failed to write audit record"
            );
        }
    }
}
