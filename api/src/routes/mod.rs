//! HTTP route handlers
//!
//! One module per surface area. Every handler is generic over the port
//! traits carried by [`crate::app::AppState`] so tests can swap the
//! production backends for in-memory fakes.

pub mod accounts;
pub mod intent;
pub mod transfers;
pub mod verify;
pub mod webhook;
