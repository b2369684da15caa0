//! # Chat Delivery Library
//!
//! Real-time message delivery and chat membership:
//! - RESTful HTTP API for chats, members and message history
//! - Per-chat WebSocket streams fed by an in-process listener registry
//! - PostgreSQL (or an in-memory store) for persistence
//! - JWT or Redis-backed session tokens for identity
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Chats, memberships, messages, repository traits and authorization
//! - **Application Layer**: Message dispatch, chat management, read-side assembly and DTOs
//! - **Infrastructure Layer**: Store backends, identity providers, listener registry, metrics
//! - **Presentation Layer**: HTTP handlers, middleware and chat streams
//!
//! ## Module Structure
//!
//! ```text
//! chat_delivery/
//! +-- config/         Configuration management
//! +-- domain/         Entities, repository traits, authorization
//! +-- application/    Services and DTOs
//! +-- infrastructure/ Postgres, memory store, Redis, registry, metrics
//! +-- presentation/   HTTP routes and WebSocket streams
//! +-- shared/         Errors and validation helpers
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
