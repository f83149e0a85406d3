use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::chat::ChatMessage;
use crate::error::LLMError;

use super::id::ConversationId;
use super::{ConversationLock, ConversationStore};

/// Process-local store. Nothing expires; entries live until removed.
#[derive(Default)]
pub struct InMemoryConversationStore {
    conversations: RwLock<HashMap<ConversationId, Vec<ChatMessage>>>,
    // kept apart from the messages so `remove` never frees a lock that is held
    locks: Mutex<HashMap<ConversationId, Arc<Mutex<()>>>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn get(&self, id: &ConversationId) -> Result<Vec<ChatMessage>, LLMError> {
        if let Some(messages) = self.conversations.read().await.get(id) {
            return Ok(messages.clone());
        }
        let mut conversations = self.conversations.write().await;
        Ok(conversations.entry(id.clone()).or_default().clone())
    }

    async fn set(&self, id: &ConversationId, messages: Vec<ChatMessage>) -> Result<(), LLMError> {
        self.conversations
            .write()
            .await
            .insert(id.clone(), messages);
        Ok(())
    }

    async fn lock(&self, id: &ConversationId) -> Result<ConversationLock, LLMError> {
        let lock = {
            let mut locks = self.locks.lock().await;
            prune_idle_locks(&mut locks);
            Arc::clone(locks.entry(id.clone()).or_default())
        };
        Ok(ConversationLock::new(lock.lock_owned().await))
    }

    async fn remove(&self, id: &ConversationId) -> Result<Option<Vec<ChatMessage>>, LLMError> {
        let removed = self.conversations.write().await.remove(id);
        prune_idle_locks(&mut *self.locks.lock().await);
        Ok(removed)
    }

    async fn len(&self) -> Result<usize, LLMError> {
        Ok(self.conversations.read().await.len())
    }
}

/// Drops locks nobody holds or waits for; they are recreated on demand.
fn prune_idle_locks(locks: &mut HashMap<ConversationId, Arc<Mutex<()>>>) {
    locks.retain(|_, lock| Arc::strong_count(lock) > 1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn id(value: &str) -> ConversationId {
        ConversationId::from(value)
    }

    #[tokio::test]
    async fn get_creates_lazily_and_is_idempotent() {
        let store = InMemoryConversationStore::new();
        assert_eq!(store.len().await.unwrap(), 0);

        let first = store.get(&id("c1")).await.unwrap();
        let second = store.get(&id("c1")).await.unwrap();

        assert!(first.is_empty());
        assert_eq!(first, second);
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn set_replaces_whole_history() {
        let store = InMemoryConversationStore::new();
        let key = id("c1");
        store
            .set(&key, vec![ChatMessage::user().content("one").build()])
            .await
            .unwrap();
        store
            .set(&key, vec![ChatMessage::user().content("two").build()])
            .await
            .unwrap();

        let messages = store.get(&key).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text(), "two");
        assert_eq!(messages, store.get(&key).await.unwrap());
    }

    #[tokio::test]
    async fn remove_returns_previous_history() {
        let store = InMemoryConversationStore::new();
        let key = id("c1");
        store
            .set(&key, vec![ChatMessage::user().content("hi").build()])
            .await
            .unwrap();

        let removed = store.remove(&key).await.unwrap().unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(store.len().await.unwrap(), 0);
        assert!(store.remove(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lock_serializes_same_conversation() {
        let store = Arc::new(InMemoryConversationStore::new());
        let held = store.lock(&id("c1")).await.unwrap();

        let contender = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.lock(&id("c1")).await.map(|_| ()) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(held);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .expect("lock released")
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn different_conversations_do_not_block() {
        let store = InMemoryConversationStore::new();
        let _first = store.lock(&id("c1")).await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), store.lock(&id("c2")))
            .await
            .expect("independent key")
            .unwrap();
    }

    #[tokio::test]
    async fn idle_locks_are_pruned() {
        let store = InMemoryConversationStore::new();
        drop(store.lock(&id("c1")).await.unwrap());
        let _held = store.lock(&id("c2")).await.unwrap();
        store
            .set(&id("c1"), vec![ChatMessage::user().content("hi").build()])
            .await
            .unwrap();

        store.remove(&id("c1")).await.unwrap();

        let locks = store.locks.lock().await;
        assert_eq!(locks.len(), 1);
        assert!(locks.contains_key(&id("c2")));
    }
}
