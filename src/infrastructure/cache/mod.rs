//! Cache Module
//!
//! Redis connection management and the session-token identity provider.
//!
//! ```text
//! +------------------------------+
//! | RedisSessionIdentityProvider |  GET {prefix}{token} -> user id
//! +------------------------------+
//!          |
//!          v
//! +-------------------+
//! | ConnectionManager |  <-- multiplexed, reconnecting
//! +-------------------+
//! ```

mod session_cache;

pub use session_cache::RedisSessionIdentityProvider;

use redis::aio::ConnectionManager;
use redis::Client;
use tracing::{info, instrument};

use crate::config::RedisSettings;

/// Creates a Redis connection manager with automatic reconnection.
///
/// # Errors
/// Returns `redis::RedisError` if the URL is invalid or the initial
/// connection fails.
#[instrument(skip(settings), fields(url = %settings.url))]
pub async fn create_redis_client(
    settings: &RedisSettings,
) -> Result<ConnectionManager, redis::RedisError> {
    info!("Connecting to Redis...");
    let client = Client::open(settings.url.as_str())?;
    let manager = ConnectionManager::new(client).await?;
    info!("Redis connection established");
    Ok(manager)
}

/// Cache key helpers.
pub mod keys {
    /// Key under which the user id for a session token is stored
    #[inline]
    pub fn session(prefix: &str, token: &str) -> String {
        format!("{}{}", prefix, token)
    }
}
