use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::cache::{ConversationId, ConversationStore};
use crate::chat::ChatMessage;
use crate::error::LLMError;

use super::events::StreamEvent;
use super::outcome::Outcome;
use super::runner::{Orchestrator, RunOptions};
use super::sink::{event_channel, EventSink};
use super::stream::EventStream;

/// Runs orchestration loops against stored conversations.
///
/// One loop at a time per conversation: the conversation lock is held from
/// loading the history until the outcome is stored.
#[derive(Clone)]
pub struct ChatService {
    orchestrator: Orchestrator,
    store: Arc<dyn ConversationStore>,
}

impl ChatService {
    pub fn new(orchestrator: Orchestrator, store: Arc<dyn ConversationStore>) -> Self {
        Self {
            orchestrator,
            store,
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    /// Appends `text` to the conversation and streams the reply from a spawned task.
    pub fn send_message(
        &self,
        id: ConversationId,
        text: String,
        model: Option<String>,
        cancel: CancellationToken,
    ) -> EventStream {
        let (sink, events) = event_channel(self.orchestrator.config().event_buffer);
        let this = self.clone();
        let task =
            tokio::spawn(async move { this.run_message(&id, text, model, &sink, &cancel).await });
        EventStream::new(events, task)
    }

    /// Same as [`ChatService::send_message`], driven against a caller-owned sink.
    ///
    /// The stored history only changes when the loop completes or exhausts its
    /// budget. A failed or cancelled loop leaves it untouched, user message
    /// included; what it streamed is reported through the `Error` event and the
    /// outcome only.
    pub async fn run_message(
        &self,
        id: &ConversationId,
        text: String,
        model: Option<String>,
        sink: &EventSink,
        cancel: &CancellationToken,
    ) -> Result<Outcome, LLMError> {
        if text.trim().is_empty() {
            let err = LLMError::InvalidRequest("message is empty".to_string());
            return Err(report(sink, err).await);
        }
        let _lock = match self.store.lock(id).await {
            Ok(lock) => lock,
            Err(err) => return Err(report(sink, err).await),
        };
        let mut messages = match self.store.get(id).await {
            Ok(messages) => messages,
            Err(err) => return Err(report(sink, err).await),
        };
        log::debug!(
            "conversation {id}: {} stored message(s), new user turn",
            messages.len()
        );
        messages.push(ChatMessage::user().content(text).build());

        let options = self.orchestrator.default_options().with_model(model);
        let outcome = self.orchestrator.run(messages, options, sink, cancel).await;

        if !outcome.is_success() {
            log::debug!("conversation {id}: loop did not complete, history unchanged");
            return Ok(outcome);
        }
        if let Err(err) = self.store.set(id, outcome.messages.clone()).await {
            log::error!("failed to store conversation {id}: {err}");
            return Err(LLMError::StoreError(format!(
                "failed to store conversation {id}: {err}"
            )));
        }
        Ok(outcome)
    }
}

/// Reports a failure that happened before the loop started.
async fn report(sink: &EventSink, err: LLMError) -> LLMError {
    log::error!("conversation setup failed: {err}");
    sink.send(StreamEvent::Error {
        message: err.to_string(),
        partial_text: None,
    })
    .await;
    err
}
