//! Session Identity Provider
//!
//! Resolves opaque session tokens issued by the account subsystem. Each
//! token is stored as a plain string key whose value is the user UUID;
//! expiry is handled by the key's Redis TTL.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use uuid::Uuid;

use super::keys;
use crate::domain::{IdentityProvider, UserId};
use crate::shared::error::AppError;

/// Session lookups against Redis.
#[derive(Clone)]
pub struct RedisSessionIdentityProvider {
    redis: ConnectionManager,
    prefix: String,
}

impl RedisSessionIdentityProvider {
    pub fn new(redis: ConnectionManager, prefix: impl Into<String>) -> Self {
        Self {
            redis,
            prefix: prefix.into(),
        }
    }
}

#[async_trait]
impl IdentityProvider for RedisSessionIdentityProvider {
    async fn resolve(&self, token: &str) -> Result<UserId, AppError> {
        if token.is_empty() {
            return Err(AppError::Unauthorized("Missing session token".into()));
        }

        let key = keys::session(&self.prefix, token);
        let mut conn = self.redis.clone();
        let value: Option<String> = conn.get(&key).await?;

        let value = value.ok_or_else(|| AppError::Unauthorized("Session expired or unknown".into()))?;
        Uuid::parse_str(value.trim())
            .map_err(|_| AppError::Unauthorized("Invalid session record".into()))
    }
}
