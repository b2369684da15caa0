//! Identity Providers
//!
//! Resolve a presented credential to a user id.
//!
//! - [`JwtIdentityProvider`]: HS256 bearer tokens whose `sub` is the user UUID
//! - [`RedisSessionIdentityProvider`](crate::infrastructure::cache::RedisSessionIdentityProvider):
//!   opaque session tokens stored in Redis

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{IdentityProvider, UserId};
use crate::shared::error::AppError;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    pub iat: i64,
}

/// Verifies HS256 tokens signed with a shared secret.
pub struct JwtIdentityProvider {
    decoding_key: DecodingKey,
    encoding_key: EncodingKey,
    validation: Validation,
}

impl JwtIdentityProvider {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Sign a token for `user_id` valid for `ttl`.
    ///
    /// Token issuance belongs to the account subsystem; this exists for
    /// tooling and tests that need a token the service will accept.
    pub fn issue(&self, user_id: UserId, ttl: Duration) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn resolve(&self, token: &str) -> Result<UserId, AppError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::Unauthorized("Token expired".into())
                }
                _ => AppError::Unauthorized("Invalid token".into()),
            },
        )?;

        Uuid::parse_str(&token_data.claims.sub)
            .map_err(|_| AppError::Unauthorized("Invalid token claims".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[tokio::test]
    async fn test_issued_token_resolves_to_user() {
        let provider = JwtIdentityProvider::new(SECRET);
        let user_id = Uuid::new_v4();
        let token = provider.issue(user_id, Duration::hours(1)).unwrap();

        assert_eq!(provider.resolve(&token).await.unwrap(), user_id);
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let provider = JwtIdentityProvider::new(SECRET);
        let token = provider.issue(Uuid::new_v4(), Duration::hours(-2)).unwrap();

        let err = provider.resolve(&token).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(msg) if msg == "Token expired"));
    }

    #[tokio::test]
    async fn test_token_from_other_secret_rejected() {
        let other = JwtIdentityProvider::new("ffffffffffffffffffffffffffffffff");
        let token = other.issue(Uuid::new_v4(), Duration::hours(1)).unwrap();

        let provider = JwtIdentityProvider::new(SECRET);
        assert!(matches!(
            provider.resolve(&token).await,
            Err(AppError::Unauthorized(_))
        ));
    }
}
