//! HTTP surface: REST handlers and the router.

pub mod handlers;
pub mod routes;
