//! Integration Tests Entry Point
//!
//! Tests are organized by module:
//! - `api/` - REST, stream registry and health endpoint tests
//! - `common/` - Shared test application and fixtures

mod api;
mod common;

pub use common::*;
