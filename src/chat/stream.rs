use std::fmt;

use serde::{Deserialize, Serialize};

use super::message::ChatMessage;
use super::tool::ToolCall;
use super::usage::Usage;

/// One `data:` payload of a chat-completions stream.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamResponse {
    /// Array of choices in the response
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
    /// Usage metadata, typically present in the final chunk
    #[serde(default)]
    pub usage: Option<Usage>,
}

/// Individual choice in a streaming response
#[derive(Debug, Clone, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub index: usize,
    /// Delta containing the incremental content
    #[serde(default)]
    pub delta: StreamDelta,
    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
}

/// Delta content in a streaming response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamDelta {
    /// The incremental content, if any
    #[serde(default)]
    pub content: Option<String>,
    /// The incremental tool calls, if any
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallFragment>>,
}

/// A piece of one tool call. Only `index` is guaranteed on every fragment;
/// the id and name usually arrive once, on the first fragment for that index.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallFragment {
    pub index: usize,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: Option<FunctionFragment>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FunctionFragment {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

/// Terminal signal from the model for the current turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    ToolCalls,
    Length,
    ContentFilter,
    #[serde(other)]
    Other,
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FinishReason::Stop => "stop",
            FinishReason::ToolCalls => "tool_calls",
            FinishReason::Length => "length",
            FinishReason::ContentFilter => "content_filter",
            FinishReason::Other => "other",
        };
        write!(f, "{name}")
    }
}

/// A typed delta produced by the streaming client.
#[derive(Debug, Clone)]
pub enum StreamChunk {
    /// Text content delta
    Text(String),

    /// A fragment of a tool call, keyed by its stream position
    ToolCallDelta {
        /// Stream position of the call this fragment belongs to
        index: usize,
        /// Present on the first fragment only, for most providers
        id: Option<String>,
        /// Present on the first fragment only, for most providers
        name: Option<String>,
        /// Partial JSON text to append to the call's arguments
        arguments: String,
    },

    /// All tool calls of the turn, reassembled, emitted as soon as the
    /// provider reports `finish_reason = tool_calls`
    ToolCalls(Vec<ToolCall>),

    /// The turn is over
    Complete {
        /// Finalized assistant message (text and/or tool calls)
        message: ChatMessage,
        finish_reason: FinishReason,
        usage: Option<Usage>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_finish_reason_maps_to_other() {
        let raw = r#"{"choices":[{"index":0,"delta":{},"finish_reason":"eos_token"}]}"#;
        let resp: StreamResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.choices[0].finish_reason, Some(FinishReason::Other));
    }

    #[test]
    fn fragment_without_function_parses() {
        let raw = r#"{"choices":[{"delta":{"tool_calls":[{"index":1}]}}]}"#;
        let resp: StreamResponse = serde_json::from_str(raw).unwrap();
        let fragments = resp.choices[0].delta.tool_calls.as_ref().unwrap();
        assert_eq!(fragments[0].index, 1);
        assert!(fragments[0].function.is_none());
    }
}
