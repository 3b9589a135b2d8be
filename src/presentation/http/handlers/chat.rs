//! Chat Handlers
//!
//! REST access to the same use cases the WebSocket gateway drives. The
//! caller's identity always comes from the verified token, never the body.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::application::dto::{
    ConversationResponse, MessageResponse, PageQuery, SendMessageRequest,
};
use crate::domain::UserId;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Send a message to another user
pub async fn send_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let message = state
        .chat
        .send_message(auth.user_id, UserId::new(body.receiver_id), &body.content)
        .await?;

    Ok((StatusCode::CREATED, Json(MessageResponse::from(message))))
}

/// History between the caller and another user, newest first
pub async fn get_conversation_messages(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(other_id): Path<i64>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<MessageResponse>>, AppError> {
    let messages = state
        .chat
        .get_conversation_messages(auth.user_id, UserId::new(other_id), page.limit, page.offset)
        .await?;

    Ok(Json(
        messages.into_iter().map(MessageResponse::from).collect(),
    ))
}

/// Every conversation the caller takes part in
pub async fn get_user_conversations(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<ConversationResponse>>, AppError> {
    let conversations = state.chat.get_user_conversations(auth.user_id).await?;

    Ok(Json(
        conversations
            .into_iter()
            .map(|c| ConversationResponse::for_user(c, auth.user_id))
            .collect(),
    ))
}

/// Mark a message addressed to the caller as read
pub async fn mark_message_as_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(message_id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    let message = state
        .chat
        .mark_message_as_read(message_id, auth.user_id)
        .await?;

    Ok(Json(MessageResponse::from(message)))
}
