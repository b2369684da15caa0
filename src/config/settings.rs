//! Application settings and configuration structures.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure containing all application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Server configuration (host, port)
    pub server: ServerSettings,

    /// Database configuration (PostgreSQL)
    pub database: DatabaseSettings,

    /// Redis configuration (session lookups)
    pub redis: RedisSettings,

    /// Which chat store backs the service
    pub storage: StorageSettings,

    /// How request credentials are resolved to users
    pub auth: AuthSettings,

    /// JWT verification settings
    pub jwt: JwtSettings,

    /// Live delivery to connected listeners
    pub delivery: DeliverySettings,

    /// Message history paging
    pub history: HistorySettings,

    /// CORS configuration
    pub cors: CorsSettings,

    /// WebSocket configuration
    pub websocket: WebSocketSettings,

    /// Current environment (development, staging, production)
    pub environment: String,
}

/// Server binding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,

    /// Port number to listen on
    pub port: u16,
}

/// PostgreSQL database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Database connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections to maintain
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    pub acquire_timeout: u64,

    /// Apply migrations at startup
    pub run_migrations: bool,
}

/// Redis configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisSettings {
    /// Redis connection URL
    pub url: String,

    /// Key prefix for session tokens
    pub session_prefix: String,
}

/// Chat store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Postgres,
    /// Process-local store, contents are lost on exit
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    pub backend: StorageBackend,
}

/// Credential resolution strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStrategy {
    /// HS256 bearer tokens whose `sub` is the user id
    Jwt,
    /// Opaque session tokens looked up in Redis
    Session,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    pub strategy: AuthStrategy,
}

/// JWT verification configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key tokens are signed with
    pub secret: String,
}

/// What to do when a listener's buffer is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Discard the oldest buffered message to make room
    DropOldest,
    /// Close the listener; its connection is then shut down
    Disconnect,
}

/// Live delivery configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliverySettings {
    /// Messages buffered per listener
    pub buffer_size: usize,

    pub overflow_policy: OverflowPolicy,

    /// Deliver a message to its author's own listeners
    pub echo_to_sender: bool,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            buffer_size: 64,
            overflow_policy: OverflowPolicy::DropOldest,
            echo_to_sender: true,
        }
    }
}

/// Message history paging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HistorySettings {
    /// Page size when the caller gives no limit
    pub default_page_size: u32,

    /// Upper bound for caller-supplied limits
    pub max_page_size: u32,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            default_page_size: 50,
            max_page_size: 100,
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsSettings {
    /// Allowed origins (comma-separated in env)
    pub allowed_origins: Vec<String>,
}

/// WebSocket configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketSettings {
    /// Maximum incoming message size in bytes (default: 64KB)
    pub max_message_size: usize,

    /// Heartbeat interval in milliseconds (default: 45000)
    pub heartbeat_interval_ms: u64,
}

/// Minimum required length for JWT secret (256 bits = 32 bytes)
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. Built-in defaults
    /// 2. config/default.toml (base configuration)
    /// 3. config/{RUN_ENV}.toml (environment-specific overrides)
    /// 4. Environment variables (highest priority)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed,
    /// or if the resulting settings are inconsistent (see [`Settings::validate`]).
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        // Determine the running environment
        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        let settings: Self = Self::builder(&environment)?
            // Load from config files
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // APP__SERVER__PORT=3000 -> server.port = 3000
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            // Map simple environment variables
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", std::env::var("SERVER_PORT").ok())?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("redis.url", std::env::var("REDIS_URL").ok())?
            .set_override_option("jwt.secret", std::env::var("JWT_SECRET").ok())?
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Builder pre-populated with every default value.
    fn builder(
        environment: &str,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("environment", environment)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("database.url", "")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout", 30)?
            .set_default("database.run_migrations", true)?
            .set_default("redis.url", "redis://127.0.0.1:6379")?
            .set_default("redis.session_prefix", "session:")?
            .set_default("storage.backend", "postgres")?
            .set_default("auth.strategy", "jwt")?
            .set_default("jwt.secret", "")?
            .set_default("delivery.buffer_size", 64)?
            .set_default("delivery.overflow_policy", "drop_oldest")?
            .set_default("delivery.echo_to_sender", true)?
            .set_default("history.default_page_size", 50)?
            .set_default("history.max_page_size", 100)?
            .set_default("cors.allowed_origins", vec!["http://localhost:3000"])?
            .set_default("websocket.max_message_size", 65536_i64)? // 64KB
            .set_default("websocket.heartbeat_interval_ms", 45000_i64)
    }

    /// Settings built purely from defaults plus the given overrides.
    ///
    /// Used by tests and tools that must not read the process environment.
    pub fn from_overrides(overrides: &[(&str, &str)]) -> Result<Self, ConfigError> {
        let mut builder = Self::builder("test")?;
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        let settings: Self = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.strategy == AuthStrategy::Jwt && self.jwt.secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ConfigError::Message(format!(
                "JWT secret must be at least {} characters for security. Current length: {}",
                MIN_JWT_SECRET_LENGTH,
                self.jwt.secret.len()
            )));
        }

        if self.storage.backend == StorageBackend::Postgres && self.database.url.is_empty() {
            return Err(ConfigError::Message(
                "database.url (or DATABASE_URL) is required for the postgres storage backend".into(),
            ));
        }

        if self.delivery.buffer_size == 0 {
            return Err(ConfigError::Message(
                "delivery.buffer_size must be at least 1".into(),
            ));
        }

        if self.history.max_page_size == 0
            || self.history.default_page_size > self.history.max_page_size
        {
            return Err(ConfigError::Message(format!(
                "history.default_page_size ({}) must be between 1 and history.max_page_size ({})",
                self.history.default_page_size, self.history.max_page_size
            )));
        }

        Ok(())
    }

    /// Get the full server address as a string.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
