//! Per-conversation message history shared across stateless requests.

mod id;
mod memory;

use async_trait::async_trait;
use tokio::sync::OwnedMutexGuard;

use crate::chat::ChatMessage;
use crate::error::LLMError;

pub use id::ConversationId;
pub use memory::InMemoryConversationStore;

/// Exclusive hold on one conversation, released on drop.
pub struct ConversationLock {
    _guard: OwnedMutexGuard<()>,
}

impl ConversationLock {
    pub fn new(guard: OwnedMutexGuard<()>) -> Self {
        Self { _guard: guard }
    }
}

/// Keyed storage for conversation histories.
///
/// Implementations must make `set` an atomic replace and must serialize holders
/// of `lock` for the same id while letting different ids proceed independently.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Stored messages, creating an empty conversation on first access.
    async fn get(&self, id: &ConversationId) -> Result<Vec<ChatMessage>, LLMError>;

    async fn set(&self, id: &ConversationId, messages: Vec<ChatMessage>) -> Result<(), LLMError>;

    /// Waits until no other caller holds the conversation.
    async fn lock(&self, id: &ConversationId) -> Result<ConversationLock, LLMError>;

    /// Drops a conversation, returning what it held.
    async fn remove(&self, id: &ConversationId) -> Result<Option<Vec<ChatMessage>>, LLMError>;

    async fn len(&self) -> Result<usize, LLMError>;
}
