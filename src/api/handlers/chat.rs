use std::convert::Infallible;

use axum::response::sse::{Event, Sse};
use axum::{extract::State, http::HeaderMap, Json};
use futures::Stream;
use tokio_util::sync::CancellationToken;

use super::helpers::{bad_request, validate_auth, ApiResult};
use crate::api::sse::into_sse;
use crate::api::types::ChatStreamRequest;
use crate::api::ServerState;
use crate::cache::ConversationId;

pub async fn handle_chat_stream(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(req): Json<ChatStreamRequest>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    validate_auth(&state, &headers)?;
    if req.conversation_id.trim().is_empty() {
        return Err(bad_request("conversationId is required"));
    }
    if req.message.trim().is_empty() {
        return Err(bad_request("message is required"));
    }
    let model = req.model.filter(|model| !model.trim().is_empty());
    log::debug!(
        "chat stream for conversation {} (model {})",
        req.conversation_id,
        model.as_deref().unwrap_or("default")
    );

    let cancel = CancellationToken::new();
    let events = state.service.send_message(
        ConversationId::from(req.conversation_id),
        req.message,
        model,
        cancel.clone(),
    );
    Ok(into_sse(events, cancel))
}
