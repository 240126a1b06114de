//! HTTP and WebSocket handlers.

pub mod character;
pub mod session_ws;
pub mod speech;
