//! Chat: sorted-pair conversations, message history, inbox previews, and
//! live message streams.
//!
//! The conversation address is derived, never chosen: both participants
//! computing `ConversationId::between` land on the same row set, so there
//! is no "create conversation" step anywhere in this module.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use linknlearn_shared::{constants::MAX_MESSAGE_CHARS, ConversationId, UserId};
use linknlearn_store::{ChatPreview, Message};

use crate::api::AppState;
use crate::error::ApiError;
use crate::sessions::Session;
use crate::watch::{sse_stream, StreamHub, EVENT_NEW_MESSAGE};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub id: Uuid,
    pub conversation: ConversationId,
    pub sender_id: UserId,
    pub text: Option<String>,
    pub image_url: Option<String>,
    /// Epoch milliseconds.
    pub created_at: i64,
}

impl From<Message> for MessageDto {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            conversation: m.conversation,
            sender_id: m.sender_id,
            text: m.text,
            image_url: m.image_url,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatPreviewDto {
    pub conversation: ConversationId,
    pub peer: UserId,
    pub last_message: MessageDto,
}

impl From<ChatPreview> for ChatPreviewDto {
    fn from(p: ChatPreview) -> Self {
        Self {
            conversation: p.conversation,
            peer: p.peer,
            last_message: p.last_message.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Sender's clock, epoch milliseconds. Server time is used when absent.
    #[serde(default)]
    pub created_at: Option<i64>,
    /// Optional client-chosen idempotency token. Re-sending with the same
    /// token returns the original message instead of appending a copy.
    #[serde(default)]
    pub dedup_token: Option<String>,
}

/// The caller's inbox: one entry per conversation with at least one
/// message, most recently active first.
pub async fn inbox(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ChatPreviewDto>>, ApiError> {
    let session = state.sessions.authenticate(&headers)?;
    let previews = state.db().inbox_of(&session.user_id)?;
    Ok(Json(previews.into_iter().map(ChatPreviewDto::from).collect()))
}

/// Full history with a peer, oldest first. An empty list, not an error,
/// when nothing has been said yet.
pub async fn history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(peer): Path<String>,
) -> Result<Json<Vec<MessageDto>>, ApiError> {
    let session = state.sessions.authenticate(&headers)?;
    let conversation = conversation_with(&session, &peer)?;
    let messages = state.db().messages_in(&conversation)?;
    Ok(Json(messages.into_iter().map(MessageDto::from).collect()))
}

/// Append a message to the conversation with a peer. Requires an accepted
/// connection between the two.
pub async fn send(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(peer): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<MessageDto>, ApiError> {
    let session = state.sessions.authenticate(&headers)?;
    let conversation = conversation_with(&session, &peer)?;
    let peer = conversation
        .peer_of(&session.user_id)
        .ok_or(ApiError::Unauthorized)?;

    let text = req.text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
    let image_url = req.image_url.filter(|u| !u.trim().is_empty());
    if text.is_none() && image_url.is_none() {
        return Err(ApiError::BadRequest(
            "A message needs text or an image".to_string(),
        ));
    }
    if let Some(t) = &text {
        if t.chars().count() > MAX_MESSAGE_CHARS {
            return Err(ApiError::BadRequest(format!(
                "Message exceeds {MAX_MESSAGE_CHARS} characters"
            )));
        }
    }

    let message = Message {
        id: Uuid::new_v4(),
        conversation: conversation.clone(),
        sender_id: session.user_id.clone(),
        text,
        image_url,
        created_at: req.created_at.unwrap_or_else(|| Utc::now().timestamp_millis()),
    };

    let stored = {
        let db = state.db();
        if !db.is_connected(&session.user_id, &peer)? {
            return Err(ApiError::Forbidden(
                "You can only message your connections".to_string(),
            ));
        }
        db.append_message(&message, req.dedup_token.as_deref())?
    };

    let dto = MessageDto::from(stored);
    state.hub.publish(
        &StreamHub::chat_topic(&conversation),
        EVENT_NEW_MESSAGE,
        &dto,
    );
    tracing::debug!(conversation = %conversation, sender = %session.user_id, "message appended");
    Ok(Json(dto))
}

/// Live stream of messages in the conversation with a peer. Events start
/// at subscription time; fetch history separately for the backlog.
pub async fn events(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(peer): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.sessions.authenticate(&headers)?;
    let conversation = conversation_with(&session, &peer)?;
    let peer = conversation
        .peer_of(&session.user_id)
        .ok_or(ApiError::Unauthorized)?;
    if !state.db().is_connected(&session.user_id, &peer)? {
        return Err(ApiError::Forbidden(
            "You can only watch conversations with your connections".to_string(),
        ));
    }
    let receiver = state.hub.subscribe(&StreamHub::chat_topic(&conversation));
    Ok(sse_stream(receiver))
}

fn conversation_with(session: &Session, peer: &str) -> Result<ConversationId, ApiError> {
    let peer = UserId::parse(peer).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    if peer == session.user_id {
        return Err(ApiError::BadRequest(
            "Cannot open a conversation with yourself".to_string(),
        ));
    }
    Ok(ConversationId::between(&session.user_id, &peer))
}
