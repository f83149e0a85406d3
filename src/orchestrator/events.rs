use serde::Serialize;

use crate::chat::{ChatMessage, Usage};

use super::state::OrchestratorState;

/// Progress of one orchestration loop, in the order it happened.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    StateChange {
        from: OrchestratorState,
        to: OrchestratorState,
    },
    TextDelta {
        delta: String,
    },
    ToolCallDelta {
        index: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        arguments: String,
    },
    ToolResult {
        tool_call_id: String,
        name: String,
        content: String,
        is_error: bool,
    },
    /// Terminal. `partial_text` is what the failed turn streamed before it broke.
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        partial_text: Option<String>,
    },
    /// Terminal. `message` is the final assistant message of the loop.
    Complete {
        message: ChatMessage,
        rounds: usize,
        budget_exhausted: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        usage: Option<Usage>,
    },
}

impl StreamEvent {
    /// Variant name, used as the SSE `event:` field.
    pub fn event_name(&self) -> &'static str {
        match self {
            StreamEvent::StateChange { .. } => "StateChange",
            StreamEvent::TextDelta { .. } => "TextDelta",
            StreamEvent::ToolCallDelta { .. } => "ToolCallDelta",
            StreamEvent::ToolResult { .. } => "ToolResult",
            StreamEvent::Error { .. } => "Error",
            StreamEvent::Complete { .. } => "Complete",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Error { .. } | StreamEvent::Complete { .. })
    }
}
