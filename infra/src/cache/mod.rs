//! Redis connectivity and cache-backed services

pub mod rate_limiter;
pub mod redis_client;

pub use rate_limiter::RedisRateLimiter;
pub use redis_client::RedisClient;

#[cfg(test)]
mod tests;
