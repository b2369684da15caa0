//! # Domain Services
//!
//! Domain services encapsulate business rules that don't naturally belong to a
//! single entity.
//!
//! - **ChatAuthorization**: role-based read/write/manage decisions per chat

mod authorization;

pub use authorization::*;
