//! # Domain Layer
//!
//! The domain layer contains the core business rules of the chat service.
//! It is independent of any external frameworks or infrastructure concerns.
//!
//! ## Structure
//!
//! - **entities**: Chats, memberships, messages and the repository traits over them
//! - **services**: Authorization decisions derived from membership roles
//!
//! ## Design Principles
//!
//! - No dependencies on infrastructure or presentation layers
//! - Repository traits define data access contracts
//! - Closed enums for chat types, roles and message kinds

pub mod entities;
pub mod services;

// Re-export commonly used types
pub use entities::*;
pub use services::*;
