//! Chat Service
//!
//! Chat management: creation, member addition, metadata edits and role
//! changes. Stored writes that produce join notices go through the
//! [`MessageDispatcher`] so the notices reach live listeners.

use std::sync::Arc;

use tracing::{info, instrument};

use super::error::ChatError;
use super::message_dispatcher::MessageDispatcher;
use crate::domain::{
    Chat, ChatAuthorization, ChatId, ChatPermissions, ChatStore, ChatType, MemberRole, Membership,
    UserId,
};

/// Maximum chat name length in characters.
pub const MAX_CHAT_NAME_LENGTH: usize = 128;

/// Maximum chat description length in characters.
pub const MAX_CHAT_DESCRIPTION_LENGTH: usize = 512;

/// Input for [`ChatService::create_chat`].
#[derive(Debug, Clone)]
pub struct CreateChatDto {
    pub chat_type: ChatType,
    pub name: String,
    pub description: String,
    /// Users to add besides the creator
    pub member_ids: Vec<UserId>,
}

/// Input for [`ChatService::update_chat`]. Absent fields stay unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateChatDto {
    pub name: Option<String>,
    pub description: Option<String>,
}

pub struct ChatService {
    store: Arc<dyn ChatStore>,
    dispatcher: Arc<MessageDispatcher>,
    authorization: ChatAuthorization<dyn ChatStore>,
}

impl ChatService {
    pub fn new(store: Arc<dyn ChatStore>, dispatcher: Arc<MessageDispatcher>) -> Self {
        Self {
            authorization: ChatAuthorization::new(Arc::clone(&store)),
            store,
            dispatcher,
        }
    }

    /// Create a chat with the creator and the requested members.
    ///
    /// Roles follow the chat type: the creator administers groups and
    /// channels, other group members can write, other channel members only
    /// read. A dialog holds exactly two users, both plain members.
    #[instrument(skip(self, request), fields(chat_type = %request.chat_type))]
    pub async fn create_chat(
        &self,
        creator: UserId,
        request: CreateChatDto,
    ) -> Result<(Chat, Vec<Membership>), ChatError> {
        let name = request.name.trim();
        let description = request.description.trim();
        validate_description(description)?;

        let mut user_ids = vec![creator];
        for id in request.member_ids {
            if !user_ids.contains(&id) {
                user_ids.push(id);
            }
        }

        match request.chat_type {
            ChatType::Dialog => {
                if user_ids.len() != 2 {
                    return Err(ChatError::Validation(
                        "A dialog needs exactly one other participant".into(),
                    ));
                }
                validate_name(name, true)?;
            }
            ChatType::Group | ChatType::Channel => validate_name(name, false)?,
        }

        let chat = Chat::new(request.chat_type, name, description);
        let members: Vec<Membership> = user_ids
            .iter()
            .map(|&user_id| {
                let role = if user_id == creator {
                    creator_role(chat.chat_type)
                } else {
                    default_role(chat.chat_type)
                };
                Membership::new(user_id, chat.id, role)
            })
            .collect();

        self.dispatcher.create_chat(&chat, &members).await?;
        Ok((chat, members))
    }

    /// Add a user to a chat. Only admins may add members.
    ///
    /// Without an explicit role the chat type's default applies.
    #[instrument(skip(self))]
    pub async fn add_member(
        &self,
        actor: UserId,
        chat_id: ChatId,
        user_id: UserId,
        role: Option<MemberRole>,
    ) -> Result<Membership, ChatError> {
        let chat = self.admin_chat(actor, chat_id).await?;

        if chat.chat_type == ChatType::Dialog {
            return Err(ChatError::Validation("Dialogs cannot gain members".into()));
        }

        let membership = Membership::new(
            user_id,
            chat_id,
            role.unwrap_or_else(|| default_role(chat.chat_type)),
        );
        self.dispatcher.add_member(&membership).await?;
        Ok(membership)
    }

    /// Change a chat's name or description. Only admins may edit.
    #[instrument(skip(self, update))]
    pub async fn update_chat(
        &self,
        actor: UserId,
        chat_id: ChatId,
        update: UpdateChatDto,
    ) -> Result<Chat, ChatError> {
        let mut chat = self.admin_chat(actor, chat_id).await?;

        if let Some(name) = update.name {
            let name = name.trim();
            validate_name(name, chat.is_private())?;
            chat.name = name.to_string();
        }
        if let Some(description) = update.description {
            let description = description.trim();
            validate_description(description)?;
            chat.description = description.to_string();
        }

        self.store.update_chat(&chat).await?;
        info!("Chat updated");
        Ok(chat)
    }

    /// Change a member's role. Only admins may do this, and a chat always
    /// keeps at least one admin.
    #[instrument(skip(self))]
    pub async fn change_member_role(
        &self,
        actor: UserId,
        chat_id: ChatId,
        user_id: UserId,
        role: MemberRole,
    ) -> Result<Membership, ChatError> {
        let store = Arc::clone(&self.store);
        let authorization = self.authorization.clone();

        // The actor's rights and the last-admin check are read under the
        // chat's write lock, together with the change itself
        self.dispatcher
            .serialized(chat_id, async move {
                load_admin_chat(&authorization, store.as_ref(), actor, chat_id).await?;

                let mut membership = store
                    .get_user_membership(user_id, chat_id)
                    .await?
                    .ok_or_else(|| ChatError::NotFound("Member not found".into()))?;

                if membership.role == role {
                    return Ok(membership);
                }

                if membership.is_admin() && store.count_admins(chat_id).await? <= 1 {
                    return Err(ChatError::Conflict(
                        "A chat must keep at least one admin".into(),
                    ));
                }

                if !store.set_member_role(chat_id, user_id, role).await? {
                    return Err(ChatError::NotFound("Member not found".into()));
                }
                info!(from = %membership.role, to = %role, "Member role changed");

                membership.role = role;
                Ok::<_, ChatError>(membership)
            })
            .await
    }

    async fn admin_chat(&self, actor: UserId, chat_id: ChatId) -> Result<Chat, ChatError> {
        load_admin_chat(&self.authorization, self.store.as_ref(), actor, chat_id).await
    }
}

/// Load a chat the actor administers.
///
/// Non-members get `NotFound`, members without admin rights `Forbidden`.
async fn load_admin_chat(
    authorization: &ChatAuthorization<dyn ChatStore>,
    store: &dyn ChatStore,
    actor: UserId,
    chat_id: ChatId,
) -> Result<Chat, ChatError> {
    let permissions: ChatPermissions = authorization.permissions(actor, chat_id).await?;
    if !permissions.is_member() {
        return Err(ChatError::chat_not_found());
    }
    if !permissions.can_manage_members() {
        return Err(ChatError::Forbidden(
            "Only chat admins can do this".into(),
        ));
    }

    store
        .get_chat(actor, chat_id)
        .await?
        .ok_or_else(ChatError::chat_not_found)
}

fn creator_role(chat_type: ChatType) -> MemberRole {
    match chat_type {
        ChatType::Group | ChatType::Channel => MemberRole::Admin,
        ChatType::Dialog => MemberRole::Member,
    }
}

fn default_role(chat_type: ChatType) -> MemberRole {
    match chat_type {
        ChatType::Channel => MemberRole::Viewer,
        ChatType::Group | ChatType::Dialog => MemberRole::Member,
    }
}

fn validate_name(name: &str, allow_empty: bool) -> Result<(), ChatError> {
    if name.is_empty() && !allow_empty {
        return Err(ChatError::Validation("Chat name must not be empty".into()));
    }
    if name.chars().count() > MAX_CHAT_NAME_LENGTH {
        return Err(ChatError::Validation(format!(
            "Chat name must be at most {} characters",
            MAX_CHAT_NAME_LENGTH
        )));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), ChatError> {
    if description.chars().count() > MAX_CHAT_DESCRIPTION_LENGTH {
        return Err(ChatError::Validation(format!(
            "Chat description must be at most {} characters",
            MAX_CHAT_DESCRIPTION_LENGTH
        )));
    }
    Ok(())
}
