//! Chat Handlers
//!
//! Chat list, detail, creation, metadata edits and membership management.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::application::dto::request::{
    AddMemberRequest, ChangeRoleRequest, CreateChatRequest, PageQuery, UpdateChatRequest,
};
use crate::application::dto::response::{
    ChatDetailResponse, ChatResponse, ChatSummaryResponse, CreateChatResponse, MembershipResponse,
};
use crate::application::services::{CreateChatDto, UpdateChatDto};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::validation::{parse_id, validation_error};
use crate::startup::AppState;

/// List the caller's chats, most recently active first
pub async fn list_chats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<ChatSummaryResponse>>, AppError> {
    let summaries = state.assembly.list_chats_for_user(auth.user_id).await?;

    Ok(Json(
        summaries.into_iter().map(ChatSummaryResponse::from).collect(),
    ))
}

/// Create a chat with the caller as creator
pub async fn create_chat(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreateChatRequest>,
) -> Result<(StatusCode, Json<CreateChatResponse>), AppError> {
    body.validate().map_err(validation_error)?;

    let request = CreateChatDto {
        chat_type: body.chat_type,
        name: body.name,
        description: body.description,
        member_ids: body.member_ids,
    };
    let created = state.chats.create_chat(auth.user_id, request).await?;

    Ok((StatusCode::CREATED, Json(CreateChatResponse::from(created))))
}

/// Chat detail with members and one page of history
pub async fn get_chat(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(chat_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ChatDetailResponse>, AppError> {
    let chat_id = parse_id(&chat_id, "chat")?;
    let page = state.assembly.page(query.limit, query.offset);

    let detail = state
        .assembly
        .get_chat_detail(auth.user_id, chat_id, page)
        .await?;

    Ok(Json(ChatDetailResponse::from(detail)))
}

/// Edit chat name or description (admins only)
pub async fn update_chat(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(chat_id): Path<String>,
    Json(body): Json<UpdateChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let chat_id = parse_id(&chat_id, "chat")?;
    body.validate().map_err(validation_error)?;

    let update = UpdateChatDto {
        name: body.name,
        description: body.description,
    };
    let chat = state.chats.update_chat(auth.user_id, chat_id, update).await?;

    Ok(Json(ChatResponse::from(chat)))
}

/// Add a member (admins only)
pub async fn add_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(chat_id): Path<String>,
    Json(body): Json<AddMemberRequest>,
) -> Result<(StatusCode, Json<MembershipResponse>), AppError> {
    let chat_id = parse_id(&chat_id, "chat")?;

    let membership = state
        .chats
        .add_member(auth.user_id, chat_id, body.user_id, body.role)
        .await?;

    Ok((StatusCode::CREATED, Json(MembershipResponse::from(membership))))
}

/// Change a member's role (admins only)
pub async fn change_member_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path((chat_id, user_id)): Path<(String, String)>,
    Json(body): Json<ChangeRoleRequest>,
) -> Result<Json<MembershipResponse>, AppError> {
    let chat_id = parse_id(&chat_id, "chat")?;
    let user_id = parse_id(&user_id, "user")?;

    let membership = state
        .chats
        .change_member_role(auth.user_id, chat_id, user_id, body.role)
        .await?;

    Ok(Json(MembershipResponse::from(membership)))
}
