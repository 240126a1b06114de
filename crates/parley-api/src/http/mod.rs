//! HTTP layer for Parley.
//!
//! Axum router with the WebSocket session endpoint at `/api/v1/session`, the
//! speech fetch endpoint, character listing, and a health check.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
