//! Infrastructure Layer
//!
//! Contains implementations for external services including:
//! - Chat stores (PostgreSQL and in-process)
//! - Identity providers (JWT, Redis sessions)
//! - The in-process listener registry for live delivery
//! - Prometheus metrics

pub mod cache;
pub mod database;
pub mod identity;
pub mod memory;
pub mod metrics;
pub mod realtime;
pub mod repositories;
