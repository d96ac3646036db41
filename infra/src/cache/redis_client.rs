//! Async Redis client wrapper
//!
//! One multiplexed connection shared by every clone; commands from
//! different tasks interleave on it without a pool. The wrapper also owns
//! key prefixing so callers never concatenate prefixes themselves.

use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use tracing::info;

use cb_shared::config::CacheConfig;

use crate::InfrastructureError;

/// Shared async Redis client
#[derive(Clone)]
pub struct RedisClient {
    connection: MultiplexedConnection,
    key_prefix: Option<String>,
}

impl RedisClient {
    /// Connect to Redis and prepare the multiplexed connection
    pub async fn new(config: CacheConfig) -> Result<Self, InfrastructureError> {
        let client = Client::open(config.url.as_str())?;
        let connection = client.get_multiplexed_tokio_connection().await?;

        info!(url = %mask_url(&config.url), "Redis connection ready");

        Ok(Self {
            connection,
            key_prefix: config.key_prefix,
        })
    }

    /// Clone the multiplexed connection for direct command access
    pub fn get_connection(&self) -> MultiplexedConnection {
        self.connection.clone()
    }

    /// Apply the configured prefix to a key
    fn prefixed(&self, key: &str) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }

    /// Store a value with a TTL in seconds
    pub async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: u64,
    ) -> Result<(), InfrastructureError> {
        let mut conn = self.get_connection();
        let _: () = conn
            .set_ex(self.prefixed(key), value, ttl_seconds)
            .await?;
        Ok(())
    }

    /// Fetch a value, `None` when the key does not exist
    pub async fn get(&self, key: &str) -> Result<Option<String>, InfrastructureError> {
        let mut conn = self.get_connection();
        let value: Option<String> = conn.get(self.prefixed(key)).await?;
        Ok(value)
    }

    /// Delete a key, reporting whether it existed
    pub async fn delete(&self, key: &str) -> Result<bool, InfrastructureError> {
        let mut conn = self.get_connection();
        let removed: i64 = conn.del(self.prefixed(key)).await?;
        Ok(removed > 0)
    }

    /// Whether a key currently exists
    pub async fn exists(&self, key: &str) -> Result<bool, InfrastructureError> {
        let mut conn = self.get_connection();
        let found: bool = conn.exists(self.prefixed(key)).await?;
        Ok(found)
    }

    /// Remaining TTL in seconds; `None` for missing keys or keys
    /// without an expiry
    pub async fn ttl(&self, key: &str) -> Result<Option<i64>, InfrastructureError> {
        let mut conn = self.get_connection();
        let ttl: i64 = conn.ttl(self.prefixed(key)).await?;
        // Redis answers -2 for a missing key and -1 for no expiry
        Ok(if ttl >= 0 { Some(ttl) } else { None })
    }

    /// Increment a counter, arming its expiry when this call creates it
    ///
    /// The returned value is the counter after the increment. Only the
    /// call that observes `1` sets the TTL, so the window is anchored at
    /// the first increment and later calls never extend it.
    pub async fn increment(
        &self,
        key: &str,
        ttl_seconds: Option<u64>,
    ) -> Result<i64, InfrastructureError> {
        let key = self.prefixed(key);
        let mut conn = self.get_connection();

        let count: i64 = conn.incr(&key, 1).await?;
        if count == 1 {
            if let Some(ttl) = ttl_seconds {
                let _: bool = conn.expire(&key, ttl as i64).await?;
            }
        }

        Ok(count)
    }

    /// Arm an expiry on an existing key
    pub async fn expire(&self, key: &str, ttl_seconds: u64) -> Result<(), InfrastructureError> {
        let mut conn = self.get_connection();
        let _: bool = conn
            .expire(self.prefixed(key), ttl_seconds as i64)
            .await?;
        Ok(())
    }

    /// Round-trip a PING to prove the server is reachable
    pub async fn health_check(&self) -> Result<bool, InfrastructureError> {
        let mut conn = self.get_connection();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong == "PONG")
    }
}

/// Hide credentials in a Redis URL before it reaches a log line
pub fn mask_url(url: &str) -> String {
    match (url.find("://"), url.find('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}****{}", &url[..scheme_end + 3], &url[at..])
        }
        _ => url.to_string(),
    }
}
