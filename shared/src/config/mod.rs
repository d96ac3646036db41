//! Configuration module with business-specific sub-modules
//!
//! This module organizes configuration into logical business areas:
//! - `cache` - Redis connection configuration (rate windows, cached lookups)
//! - `database` - Database connection and pool configuration
//! - `environment` - Environment detection and logging configuration
//! - `rate_limit` - Per-operation-class rate limiting thresholds
//! - `server` - HTTP server and CORS configuration
//! - `transfer` - Two-factor gate thresholds and ledger backend selection
//! - `verify` - Verification provider credentials and lockout policy
//! - `webhook` - Webhook signature secret and public URL base

pub mod cache;
pub mod database;
pub mod environment;
pub mod rate_limit;
pub mod server;
pub mod transfer;
pub mod verify;
pub mod webhook;

use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use cache::CacheConfig;
pub use database::DatabaseConfig;
pub use environment::{Environment, LogFormat, LoggingConfig};
pub use rate_limit::{RateLimitConfig, WindowLimit};
pub use server::{CorsConfig, ServerConfig};
pub use transfer::{LedgerConfig, LedgerMode, TransferConfig};
pub use verify::{VerifyConfig, VerifyMode};
pub use webhook::WebhookConfig;

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Environment configuration
    pub environment: Environment,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Cache configuration
    pub cache: CacheConfig,

    /// Rate limiting configuration
    pub rate_limit: RateLimitConfig,

    /// Verification provider and lockout configuration
    pub verify: VerifyConfig,

    /// Transfer gate and ledger configuration
    pub transfer: TransferConfig,

    /// Webhook authentication configuration
    pub webhook: WebhookConfig,

    /// CORS configuration
    #[serde(default)]
    pub cors: CorsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let env = Environment::default();
        Self {
            environment: env,
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            cache: CacheConfig::default(),
            rate_limit: RateLimitConfig::default(),
            verify: VerifyConfig::default(),
            transfer: TransferConfig::default(),
            webhook: WebhookConfig::default(),
            cors: CorsConfig::default(),
            logging: LoggingConfig::for_environment(env),
        }
    }
}

impl AppConfig {
    /// Create configuration for development environment
    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            rate_limit: RateLimitConfig::development(),
            cors: CorsConfig::development(),
            logging: LoggingConfig::for_environment(Environment::Development),
            ..Default::default()
        }
    }

    /// Create configuration for production environment
    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig::new("0.0.0.0", 8080),
            rate_limit: RateLimitConfig::production(),
            logging: LoggingConfig::for_environment(Environment::Production),
            ..Default::default()
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let environment = Environment::from_env();
        Self {
            environment,
            server: ServerConfig::from_env(),
            database: DatabaseConfig::from_env(),
            cache: CacheConfig::from_env(),
            rate_limit: RateLimitConfig::from_env(),
            verify: VerifyConfig::from_env(),
            transfer: TransferConfig::from_env(),
            webhook: WebhookConfig::from_env(),
            cors: CorsConfig::default(),
            logging: LoggingConfig::for_environment(environment),
        }
    }
}
