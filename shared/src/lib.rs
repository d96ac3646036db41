//! Shared utilities and common types for the CarteraBot server
//!
//! This crate provides common functionality used across all server modules:
//! - Configuration types
//! - Phone number canonicalization, masking and hashing
//! - Validation helpers for account identifiers and confirmation codes

pub mod config;
pub mod types;
pub mod utils;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, Environment, LoggingConfig,
    CacheConfig, DatabaseConfig, RateLimitConfig,
    ServerConfig, CorsConfig,
    TransferConfig, VerifyConfig, WebhookConfig,
};
pub use types::{ApiResponse, ErrorResponse, PhoneNumber, PhoneParseError};
pub use utils::validation;
