//! Streaming client for OpenAI-compatible chat-completions endpoints.
//!
//! One call to [`OpenAIClient::chat_stream`] issues one POST and yields a lazy,
//! single-pass stream of [`StreamChunk`](crate::chat::StreamChunk)s. Malformed
//! payloads are skipped and counted rather than aborting the stream.

mod accumulator;
mod chunks;
mod request;
mod sse;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::chat::{ChatProvider, ChatRequest, ChunkStream};
use crate::config::ProviderConfig;
use crate::error::LLMError;

pub(crate) use chunks::create_chunk_stream;
use request::ChatCompletionRequest;

const CHAT_COMPLETIONS_PATH: &str = "chat/completions";

/// Client for any provider exposing `POST /chat/completions` with `stream: true`.
pub struct OpenAIClient {
    client: reqwest::Client,
    base_url: reqwest::Url,
    api_key: SecretString,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    skipped_chunks: Arc<AtomicU64>,
}

impl OpenAIClient {
    /// Creates a client from provider settings.
    ///
    /// The HTTP timeout covers the whole streamed response, so it is measured in
    /// minutes rather than seconds.
    pub fn new(config: &ProviderConfig) -> Result<Self, LLMError> {
        let api_key = config
            .resolve_api_key()
            .ok_or_else(|| LLMError::AuthError("Missing provider API key".to_string()))?;
        if api_key.expose_secret().is_empty() {
            return Err(LLMError::AuthError("Missing provider API key".to_string()));
        }
        let base_url = parse_base_url(&config.base_url)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            base_url,
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            skipped_chunks: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn base_url(&self) -> &reqwest::Url {
        &self.base_url
    }

    /// Number of stream payloads dropped because they could not be parsed,
    /// across every stream opened by this client.
    pub fn skipped_chunks(&self) -> u64 {
        self.skipped_chunks.load(Ordering::Relaxed)
    }

    fn completions_url(&self) -> Result<reqwest::Url, LLMError> {
        self.base_url
            .join(CHAT_COMPLETIONS_PATH)
            .map_err(|e| LLMError::HttpError(e.to_string()))
    }

    fn log_request_payload<T: Serialize>(&self, label: &str, body: &T) {
        if !log::log_enabled!(log::Level::Trace) {
            return;
        }
        if let Ok(json) = serde_json::to_string(body) {
            log::trace!("{label}: {json}");
        }
    }

    async fn ensure_success_response(
        &self,
        response: reqwest::Response,
        context: &str,
    ) -> Result<reqwest::Response, LLMError> {
        log::debug!("{context} HTTP status: {}", response.status());
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let error_text = response.text().await?;
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(LLMError::AuthError(format!("{context} returned {status}: {error_text}")));
        }
        Err(LLMError::ResponseFormatError {
            message: format!("{context} returned error status: {status}"),
            raw_response: error_text,
        })
    }
}

#[async_trait]
impl ChatProvider for OpenAIClient {
    async fn chat_stream(&self, request: ChatRequest) -> Result<ChunkStream, LLMError> {
        let body = ChatCompletionRequest {
            model: request.model.as_deref().unwrap_or(&self.model),
            messages: &request.messages,
            tools: (!request.tools.is_empty()).then_some(request.tools.as_slice()),
            stream: true,
            temperature: request.temperature.or(self.temperature),
            max_tokens: request.max_tokens.or(self.max_tokens),
        };
        self.log_request_payload("chat completion request", &body);

        let response = self
            .client
            .post(self.completions_url()?)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;
        let response = self
            .ensure_success_response(response, "chat completions")
            .await?;
        Ok(create_chunk_stream(
            response.bytes_stream(),
            Arc::clone(&self.skipped_chunks),
        ))
    }

    fn default_model(&self) -> &str {
        &self.model
    }
}

fn parse_base_url(raw: &str) -> Result<reqwest::Url, LLMError> {
    // `Url::join` replaces the last path segment unless the base ends with '/'
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    reqwest::Url::parse(&normalized)
        .map_err(|e| LLMError::ConfigError(format!("invalid provider base_url {raw}: {e}")))
}
