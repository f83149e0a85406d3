//! TOML configuration for the provider, the orchestration loop and the server.

mod error;
mod load;
mod types;

pub use error::ConfigError;
pub use load::{default_config_path, load_config, parse_config, LoadedConfig};
pub use types::{
    AppConfig, LoggingConfig, OrchestratorConfig, ProviderConfig, ServerConfig,
    ToolExecutionMode, API_KEY_ENV,
};
