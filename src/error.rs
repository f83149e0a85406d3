use thiserror::Error;

/// Error types that can occur while talking to a provider or driving a conversation.
#[derive(Debug, Error)]
pub enum LLMError {
    /// HTTP request/response errors, including mid-stream transport failures
    #[error("HTTP error: {0}")]
    HttpError(String),
    /// Authentication and authorization errors
    #[error("Auth error: {0}")]
    AuthError(String),
    /// Invalid request parameters or format
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    /// Errors returned by the LLM provider
    #[error("Provider error: {0}")]
    ProviderError(String),
    /// API response parsing or format error
    #[error("Response format error: {message}. Raw response: {raw_response}")]
    ResponseFormatError {
        message: String,
        raw_response: String,
    },
    /// JSON serialization/deserialization errors
    #[error("JSON parse error: {0}")]
    JsonError(String),
    /// The provider closed the body before signalling the end of the turn
    #[error("Stream ended before the provider finished the turn")]
    StreamTruncated,
    /// No bytes arrived from the provider within the idle window
    #[error("No data received from provider for {0}s")]
    IdleTimeout(u64),
    /// The caller went away before the turn finished
    #[error("Request cancelled")]
    Cancelled,
    /// Conversation store failures
    #[error("Store error: {0}")]
    StoreError(String),
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// Generic error
    #[error("Generic error: {0}")]
    Generic(String),
}

/// Converts reqwest HTTP errors into LLMErrors
impl From<reqwest::Error> for LLMError {
    fn from(err: reqwest::Error) -> Self {
        LLMError::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for LLMError {
    fn from(err: serde_json::Error) -> Self {
        LLMError::JsonError(format!(
            "{} at line {} column {}",
            err,
            err.line(),
            err.column()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_errors_carry_position() {
        let err = serde_json::from_str::<serde_json::Value>("{\"a\":").unwrap_err();
        let converted = LLMError::from(err);
        match converted {
            LLMError::JsonError(message) => assert!(message.contains("line 1")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
