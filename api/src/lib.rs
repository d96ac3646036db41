//! HTTP layer for CarteraBot
//!
//! Hosts two surfaces over the same domain services: the signed WhatsApp
//! webhook (form-encoded in, TwiML out) and a JSON REST API for
//! server-to-server callers. All domain decisions live in `cb_core`;
//! this crate only translates HTTP in and out.

pub mod app;
pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod twiml;
