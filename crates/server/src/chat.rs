use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use tripchat_agent::{TurnRequest, TurnResponse};
use tripchat_core::domain::conversation::{Conversation, ConversationId, HistoryEntry};
use tripchat_core::domain::user::UserId;

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

pub async fn send(
    State(state): State<AppState>,
    payload: Result<Json<TurnRequest>, JsonRejection>,
) -> Result<Json<TurnResponse>, ApiError> {
    let Json(request) = payload?;
    let response = state.runtime.handle_turn(request).await?;
    Ok(Json(response))
}

pub async fn list_conversations(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Conversation>>, ApiError> {
    let conversations = state.store.conversations.list_for_user(&UserId(user_id)).await?;
    Ok(Json(conversations))
}

/// Whole history, oldest first.
pub async fn list_messages(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    let messages = state.store.messages.list_all(&ConversationId(conversation_id)).await?;
    Ok(Json(messages.iter().map(|message| message.to_history()).collect()))
}

pub async fn conversation(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> Result<Json<Conversation>, ApiError> {
    let id = ConversationId(conversation_id);
    let conversation = state
        .store
        .conversations
        .find_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("conversation", &id))?;
    Ok(Json(conversation))
}

/// Removes the conversation with its messages and linked trip. Deleting a
/// conversation that is already gone still succeeds.
pub async fn delete_conversation(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> Result<Json<MessageBody>, ApiError> {
    let id = ConversationId(conversation_id);
    let existed = state.store.conversations.delete_cascade(&id).await?;
    tracing::info!(
        event_name = "http.conversation.deleted",
        conversation_id = %id,
        existed,
        "conversation deleted"
    );
    Ok(Json(MessageBody { message: "Conversation deleted successfully".to_string() }))
}
