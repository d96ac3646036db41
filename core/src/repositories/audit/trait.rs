//! Audit log repository trait defining the interface for audit persistence.

use async_trait::async_trait;

use crate::domain::entities::audit::AuditRecord;
use crate::errors::DomainError;

/// Repository trait for appending audit records
///
/// The trail is append-only from the application's point of view:
/// nothing in the decision logic ever reads it back, and the service
/// layer guarantees a failed append never surfaces to the caller.
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Append one record to the trail
    ///
    /// # Returns
    /// * `Ok(())` on successful append
    /// * `Err(DomainError)` if the write fails; callers log and move on
    async fn append(&self, record: &AuditRecord) -> Result<(), DomainError>;
}
