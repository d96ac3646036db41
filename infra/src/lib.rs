//! Infrastructure layer for the CarteraBot server
//!
//! Concrete adapters behind the ports that `cb_core` defines: MySQL
//! repositories for sessions, lockouts, transfers and the audit log, a
//! Redis-backed rate limiter, the verification challenge providers and
//! the ledger backends. Nothing in here makes business decisions; this
//! crate only knows how to talk to the outside world.

// Re-export domain errors so adapter code can map into them directly
pub use cb_core::errors::*;

#[cfg(feature = "redis-cache")]
pub mod cache;
#[cfg(feature = "mysql")]
pub mod database;
#[cfg(feature = "mysql")]
pub mod ledger;
pub mod verify;

/// Errors raised while building or operating infrastructure components
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Database connection or query error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Redis connection or command error
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// HTTP client error while calling an external service
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Missing or inconsistent configuration
    #[error("Configuration error: {0}")]
    Config(String),
}
