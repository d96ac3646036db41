//! No-op implementation of AuditLogRepository for when auditing is not needed

use async_trait::async_trait;

use super::AuditLogRepository;
use crate::domain::entities::audit::AuditRecord;
use crate::errors::DomainError;

/// No-op implementation of AuditLogRepository
///
/// Discards every record; used in tests and tools that do not care
/// about the trail.
pub struct NoOpAuditLogRepository;

impl NoOpAuditLogRepository {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NoOpAuditLogRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditLogRepository for NoOpAuditLogRepository {
    async fn append(&self, _record: &AuditRecord) -> Result<(), DomainError> {
        Ok(())
    }
}

// Also implement for () to allow simple type defaults
#[async_trait]
impl AuditLogRepository for () {
    async fn append(&self, _record: &AuditRecord) -> Result<(), DomainError> {
        Ok(())
    }
}
