//! Streaming chat orchestration with local tool calling.
//!
//! A conversation is driven against an OpenAI-compatible chat-completions
//! provider: partial output streams out as it arrives, tool calls requested by
//! the model run against a [`tools::ToolRegistry`], and their results are fed
//! back until the model answers or the tool-call budget is spent.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use chatloop::cache::InMemoryConversationStore;
//! use chatloop::client::OpenAIClient;
//! use chatloop::config::AppConfig;
//! use chatloop::orchestrator::{ChatService, Orchestrator};
//! use chatloop::tools::ToolRegistry;
//! use futures::StreamExt;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), chatloop::LLMError> {
//! let config = AppConfig::default();
//! let provider = Arc::new(OpenAIClient::new(&config.provider)?);
//! let orchestrator = Orchestrator::new(provider, Arc::new(ToolRegistry::new()), config.orchestrator);
//! let service = ChatService::new(orchestrator, Arc::new(InMemoryConversationStore::new()));
//!
//! let mut events = service.send_message(
//!     "conversation-1".into(),
//!     "What's 2+2?".to_string(),
//!     None,
//!     CancellationToken::new(),
//! );
//! while let Some(event) = events.next().await {
//!     println!("{}", event.event_name());
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod tools;

#[cfg(feature = "api")]
pub mod api;

#[cfg(test)]
mod test_support;

pub use chat::{ChatMessage, ChatRole, FunctionCall, ToolCall};
pub use error::LLMError;
