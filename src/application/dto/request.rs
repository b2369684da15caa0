//! Request DTOs
//!
//! Data structures for API request bodies and query strings.

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::domain::{ChatType, MemberRole};

/// Create chat request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateChatRequest {
    #[serde(rename = "type")]
    pub chat_type: ChatType,

    /// Optional for dialogs
    #[serde(default)]
    #[validate(length(max = 128, message = "Name must be at most 128 characters"))]
    pub name: String,

    #[serde(default)]
    #[validate(length(max = 512, message = "Description must be at most 512 characters"))]
    pub description: String,

    /// Users to add besides the creator
    #[serde(default)]
    #[validate(length(max = 1000, message = "At most 1000 initial members"))]
    pub member_ids: Vec<Uuid>,
}

/// Update chat request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateChatRequest {
    #[validate(length(min = 1, max = 128, message = "Name must be 1-128 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 512, message = "Description must be at most 512 characters"))]
    pub description: Option<String>,
}

/// Post message request
#[derive(Debug, Deserialize, Validate)]
pub struct PostMessageRequest {
    #[validate(length(min = 1, max = 4000, message = "Message must be 1-4000 characters"))]
    pub text: String,
}

/// Add member request
#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: Uuid,

    /// Defaults to the chat type's default role
    pub role: Option<MemberRole>,
}

/// Change member role request
#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: MemberRole,
}

/// History paging query (`?limit=&offset=`)
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}
