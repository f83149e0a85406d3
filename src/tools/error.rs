//! Tool execution error types.

/// Failures of a single tool invocation.
///
/// These never abort a conversation: the orchestrator renders them into the
/// tool-result message so the model can correct itself.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ToolError {
    /// The model asked for a tool that is not registered.
    #[error("tool not found: {0}")]
    NotFound(String),

    /// Arguments were not valid JSON or did not match the handler's shape.
    #[error("invalid tool arguments: {0}")]
    InvalidArgs(String),

    /// The handler ran and reported a failure.
    #[error("tool execution failed: {0}")]
    Execution(String),

    #[error("tool timed out after {0}ms")]
    Timeout(u64),

    /// Registration was attempted twice under the same name.
    #[error("tool already registered: {0}")]
    AlreadyRegistered(String),
}
