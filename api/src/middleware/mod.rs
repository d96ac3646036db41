//! HTTP middleware: CORS policy and security headers

pub mod cors;
pub mod security;

pub use cors::create_cors;
pub use security::SecurityHeaders;
