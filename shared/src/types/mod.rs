//! Common type definitions shared across server crates

mod phone;
pub mod response;

pub use phone::{PhoneNumber, PhoneParseError};
pub use response::{ApiResponse, ErrorResponse, HealthResponse, HealthStatus, ServiceHealth};
