use serde::{Deserialize, Serialize};

use crate::chat::ChatMessage;

/// Body of `POST /v1/chat/stream`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatStreamRequest {
    pub conversation_id: String,
    pub message: String,
    /// Overrides the configured model for this message
    #[serde(default)]
    pub model: Option<String>,
}

/// Body of `GET /v1/conversations/{id}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResponse {
    pub conversation_id: String,
    pub messages: Vec<ChatMessage>,
}
