mod message;
mod stream;
mod tool;
mod traits;
mod usage;

pub use message::{ChatMessage, ChatMessageBuilder, ChatRole};
pub use stream::{
    FinishReason, FunctionFragment, StreamChoice, StreamChunk, StreamDelta, StreamResponse,
    ToolCallFragment,
};
pub use tool::{FunctionCall, FunctionTool, ParameterProperty, ParametersSchema, Tool, ToolCall};
pub use traits::{ChatProvider, ChatRequest, ChunkStream};
pub use usage::Usage;
