//! Presentation Layer
//!
//! REST routes, middleware and the WebSocket chat streams.

pub mod http;
pub mod middleware;
pub mod websocket;
