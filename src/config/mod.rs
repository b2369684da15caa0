//! # Configuration Module
//!
//! This module handles application configuration loading and management.
//! Configuration can be loaded from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{environment}.toml)
//! - .env files (via dotenvy)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chat_delivery::config::Settings;
//!
//! let settings = Settings::load()?;
//! println!("Listener buffer: {}", settings.delivery.buffer_size);
//! ```

mod settings;

pub use settings::*;
