//! HTTP gateway streaming orchestration events as Server-Sent Events.
//!
//! `POST /v1/chat/stream` runs one user message through a [`ChatService`] and
//! streams every [`StreamEvent`](crate::orchestrator::StreamEvent) as a named SSE
//! event, followed by a final `done` event.

mod handlers;
mod sse;
mod types;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::error::LLMError;
use crate::orchestrator::ChatService;

pub use types::{ChatStreamRequest, ConversationResponse};

/// State shared by every request handler.
#[derive(Clone)]
pub struct ServerState {
    pub service: ChatService,
    /// Required bearer token, if any
    pub auth_key: Option<String>,
}

pub struct Server {
    state: ServerState,
}

impl Server {
    pub fn new(service: ChatService) -> Self {
        Self {
            state: ServerState {
                service,
                auth_key: None,
            },
        }
    }

    pub fn with_auth_key(mut self, auth_key: Option<String>) -> Self {
        self.state.auth_key = auth_key.filter(|key| !key.is_empty());
        self
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/v1/chat/stream", post(handlers::handle_chat_stream))
            .route(
                "/v1/conversations/:id",
                get(handlers::get_conversation).delete(handlers::delete_conversation),
            )
            .route("/health", get(handlers::health))
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Serves until the listener fails.
    pub async fn run(self, addr: &str) -> Result<(), LLMError> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| LLMError::Generic(format!("failed to bind {addr}: {e}")))?;
        log::info!("listening on {addr}");
        axum::serve(listener, self.router())
            .await
            .map_err(|e| LLMError::Generic(e.to_string()))
    }
}
