use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::Stream;

use crate::error::LLMError;

use super::message::ChatMessage;
use super::stream::StreamChunk;
use super::tool::Tool;

/// A lazy, single-pass stream of typed deltas for one assistant turn.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, LLMError>> + Send>>;

/// Parameters of one chat completion.
///
/// Unset sampling fields fall back to the provider's configured defaults.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<Tool>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }
}

/// Trait for providers that can stream a chat completion with tool support.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Opens one streaming completion. The returned stream cannot be restarted.
    async fn chat_stream(&self, request: ChatRequest) -> Result<ChunkStream, LLMError>;

    /// Model used when a request does not name one.
    fn default_model(&self) -> &str;
}
