use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

/// Environment variable consulted when `provider.api_key` is not set.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

const DEFAULT_BIND: &str = "127.0.0.1:3000";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/";
const DEFAULT_MODEL: &str = "gpt-4.1-nano";
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_TOKENS: u32 = 1000;
const DEFAULT_TIMEOUT_SECONDS: u64 = 300;
const DEFAULT_MAX_TOOL_CALLS: usize = 5;
const DEFAULT_TOOL_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub orchestrator: OrchestratorConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// When set, requests must carry `Authorization: Bearer <auth_key>`
    pub auth_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            auth_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: Option<SecretString>,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Covers the whole streamed response, not just the first byte
    pub timeout_seconds: u64,
}

impl ProviderConfig {
    /// The configured key, falling back to [`API_KEY_ENV`].
    pub fn resolve_api_key(&self) -> Option<SecretString> {
        self.api_key.clone().or_else(|| {
            std::env::var(API_KEY_ENV)
                .ok()
                .map(SecretString::new)
        })
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: Some(DEFAULT_TEMPERATURE),
            max_tokens: Some(DEFAULT_MAX_TOKENS),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Maximum number of tool-execution rounds per user message
    pub max_tool_calls: usize,
    pub tool_execution: ToolExecutionMode,
    /// 0 disables the per-tool timeout
    pub tool_timeout_ms: u64,
    /// Fail the round when the provider sends nothing for this long; 0 disables it
    pub idle_timeout_secs: Option<u64>,
    /// Bound the event channel; intermediate text deltas are dropped when full
    pub event_buffer: Option<usize>,
    /// Prepended to conversations that do not start with a system message
    pub system_prompt: Option<String>,
}

impl OrchestratorConfig {
    pub fn tool_timeout(&self) -> Option<Duration> {
        (self.tool_timeout_ms > 0).then(|| Duration::from_millis(self.tool_timeout_ms))
    }

    /// `None` when unset or 0.
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_tool_calls: DEFAULT_MAX_TOOL_CALLS,
            tool_execution: ToolExecutionMode::Sequential,
            tool_timeout_ms: DEFAULT_TOOL_TIMEOUT_MS,
            idle_timeout_secs: None,
            event_buffer: None,
            system_prompt: None,
        }
    }
}

/// How the tool calls of one assistant turn are executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolExecutionMode {
    /// One after another, in arrival order
    #[default]
    Sequential,
    /// Concurrently; results are still appended in arrival order
    Parallel,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
