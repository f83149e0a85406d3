use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

use super::helpers::{internal_error, not_found, validate_auth, ApiResult};
use crate::api::types::ConversationResponse;
use crate::api::ServerState;
use crate::cache::ConversationId;

pub async fn get_conversation(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<ConversationResponse>> {
    validate_auth(&state, &headers)?;
    let messages = state
        .service
        .store()
        .get(&ConversationId::from(id.as_str()))
        .await
        .map_err(|e| internal_error(e.to_string()))?;
    Ok(Json(ConversationResponse {
        conversation_id: id,
        messages,
    }))
}

pub async fn delete_conversation(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    validate_auth(&state, &headers)?;
    let key = ConversationId::from(id);
    let store = state.service.store();
    // wait for an in-flight loop so it cannot store the history again afterwards
    let _lock = store
        .lock(&key)
        .await
        .map_err(|e| internal_error(e.to_string()))?;
    match store.remove(&key).await {
        Ok(Some(_)) => Ok(StatusCode::NO_CONTENT),
        Ok(None) => Err(not_found(format!("Unknown conversation: {key}"))),
        Err(e) => Err(internal_error(e.to_string())),
    }
}

pub async fn health() -> &'static str {
    "ok"
}
