//! User identity lookups.
//!
//! Users are owned by the account subsystem. This module only models what the
//! chat core consumes from it: resolving a credential to a user id and
//! looking up display names.

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::shared::error::AppError;

/// User identifier.
pub type UserId = Uuid;

/// Resolves a presented credential to a stable user id.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns `AppError::Unauthorized` when the token is not valid.
    async fn resolve(&self, token: &str) -> Result<UserId, AppError>;
}

/// Read access to user display names.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look up display names. Unknown ids are absent from the result.
    async fn display_names(&self, user_ids: &[UserId]) -> Result<HashMap<UserId, String>, AppError>;
}

/// Name to show for `user_id`, falling back to the id itself.
pub fn display_name_or_id(names: &HashMap<UserId, String>, user_id: UserId) -> String {
    names
        .get(&user_id)
        .cloned()
        .unwrap_or_else(|| user_id.to_string())
}
