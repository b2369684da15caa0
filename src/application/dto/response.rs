//! Response DTOs
//!
//! Data structures for API response bodies. Enums serialize as lowercase
//! names; timestamps as RFC 3339.

use serde::Serialize;

use crate::application::services::{ChatDetail, ChatSummary, MemberView};
use crate::domain::{Chat, ChatType, MemberRole, Membership, Message, MessageKind};

/// Chat response
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub chat_type: ChatType,
    pub name: String,
    pub description: String,
    pub created_at: String,
}

impl From<Chat> for ChatResponse {
    fn from(chat: Chat) -> Self {
        Self {
            id: chat.id.to_string(),
            chat_type: chat.chat_type,
            name: chat.name,
            description: chat.description,
            created_at: chat.created_at.to_rfc3339(),
        }
    }
}

/// Message response
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub id: String,
    pub chat_id: String,
    pub author_id: String,
    pub text: String,
    pub kind: MessageKind,
    pub created_at: String,
}

impl From<&Message> for MessageResponse {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id.to_string(),
            chat_id: message.chat_id.to_string(),
            author_id: message.author_id.to_string(),
            text: message.text.clone(),
            kind: message.kind,
            created_at: message.created_at.to_rfc3339(),
        }
    }
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        Self::from(&message)
    }
}

/// Membership response
#[derive(Debug, Serialize)]
pub struct MembershipResponse {
    pub chat_id: String,
    pub user_id: String,
    pub role: MemberRole,
    pub joined_at: String,
}

impl From<Membership> for MembershipResponse {
    fn from(membership: Membership) -> Self {
        Self {
            chat_id: membership.chat_id.to_string(),
            user_id: membership.user_id.to_string(),
            role: membership.role,
            joined_at: membership.joined_at.to_rfc3339(),
        }
    }
}

/// Chat member with display name
#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub user_id: String,
    pub display_name: String,
    pub role: MemberRole,
    pub joined_at: String,
}

impl From<MemberView> for MemberResponse {
    fn from(member: MemberView) -> Self {
        Self {
            user_id: member.membership.user_id.to_string(),
            display_name: member.display_name,
            role: member.membership.role,
            joined_at: member.membership.joined_at.to_rfc3339(),
        }
    }
}

/// Chat list entry
#[derive(Debug, Serialize)]
pub struct ChatSummaryResponse {
    #[serde(flatten)]
    pub chat: ChatResponse,
    pub role: MemberRole,
    pub last_message: Option<MessageResponse>,
}

impl From<ChatSummary> for ChatSummaryResponse {
    fn from(summary: ChatSummary) -> Self {
        Self {
            chat: ChatResponse::from(summary.chat),
            role: summary.role,
            last_message: summary.last_message.map(MessageResponse::from),
        }
    }
}

/// Chat detail view
#[derive(Debug, Serialize)]
pub struct ChatDetailResponse {
    pub chat: ChatResponse,
    pub members: Vec<MemberResponse>,
    /// Newest first
    pub messages: Vec<MessageResponse>,
    pub limit: u32,
    pub offset: u32,
    pub is_admin: bool,
    pub can_write: bool,
    pub is_member: bool,
    pub is_private: bool,
}

impl From<ChatDetail> for ChatDetailResponse {
    fn from(detail: ChatDetail) -> Self {
        Self {
            chat: ChatResponse::from(detail.chat),
            members: detail.members.into_iter().map(MemberResponse::from).collect(),
            messages: detail.messages.into_iter().map(MessageResponse::from).collect(),
            limit: detail.page.limit,
            offset: detail.page.offset,
            is_admin: detail.is_admin,
            can_write: detail.can_write,
            is_member: detail.is_member,
            is_private: detail.is_private,
        }
    }
}

/// Chat creation result
#[derive(Debug, Serialize)]
pub struct CreateChatResponse {
    pub chat: ChatResponse,
    pub members: Vec<MembershipResponse>,
}

impl From<(Chat, Vec<Membership>)> for CreateChatResponse {
    fn from((chat, members): (Chat, Vec<Membership>)) -> Self {
        Self {
            chat: ChatResponse::from(chat),
            members: members.into_iter().map(MembershipResponse::from).collect(),
        }
    }
}
