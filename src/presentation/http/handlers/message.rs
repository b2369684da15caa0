//! Message Handlers

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::application::dto::request::{PageQuery, PostMessageRequest};
use crate::application::dto::response::MessageResponse;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::validation::{parse_id, validation_error};
use crate::startup::AppState;

/// Get one page of a chat's history, newest first
pub async fn get_messages(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(chat_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<MessageResponse>>, AppError> {
    let chat_id = parse_id(&chat_id, "chat")?;
    let page = state.assembly.page(query.limit, query.offset);

    let messages = state
        .assembly
        .get_messages(auth.user_id, chat_id, page)
        .await?;

    Ok(Json(messages.into_iter().map(MessageResponse::from).collect()))
}

/// Post a message; connected listeners receive it once it is stored
pub async fn post_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(chat_id): Path<String>,
    Json(body): Json<PostMessageRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let chat_id = parse_id(&chat_id, "chat")?;
    body.validate().map_err(validation_error)?;

    let message = state
        .dispatcher
        .post_message(auth.user_id, chat_id, &body.text)
        .await?;

    Ok((StatusCode::CREATED, Json(MessageResponse::from(message))))
}
