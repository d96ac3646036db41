//! MySQL connection pool management

use std::fmt;
use std::time::Duration;

use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use tracing::info;

use cb_shared::config::DatabaseConfig;

use crate::InfrastructureError;

/// Shared MySQL connection pool
///
/// Clones share the underlying pool, so one instance built at startup can
/// be handed to every repository.
#[derive(Clone)]
pub struct DatabasePool {
    pool: MySqlPool,
    max_connections: u32,
}

/// Snapshot of pool usage for health endpoints and logs
#[derive(Debug, Clone, Copy)]
pub struct PoolStatistics {
    /// Connections currently open
    pub connections: u32,
    /// Open connections sitting idle
    pub idle_connections: u32,
    /// Upper bound configured for the pool
    pub max_connections: u32,
}

impl fmt::Display for PoolStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} connections ({} idle)",
            self.connections, self.max_connections, self.idle_connections
        )
    }
}

impl DatabasePool {
    /// Connect to MySQL with the pool limits from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self, InfrastructureError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout))
            .idle_timeout(Duration::from_secs(config.idle_timeout))
            .max_lifetime(Duration::from_secs(config.max_lifetime))
            .connect(&config.url)
            .await?;

        info!(
            max_connections = config.max_connections,
            "Database connection pool ready"
        );

        Ok(Self {
            pool,
            max_connections: config.max_connections,
        })
    }

    /// Borrow the inner pool for query execution
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Round-trip a trivial query to prove the database is reachable
    pub async fn health_check(&self) -> Result<(), InfrastructureError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Current pool usage
    pub fn statistics(&self) -> PoolStatistics {
        PoolStatistics {
            connections: self.pool.size(),
            idle_connections: self.pool.num_idle() as u32,
            max_connections: self.max_connections,
        }
    }

    /// Close all connections; pending queries are allowed to finish
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
