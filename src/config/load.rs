use std::fs;
use std::path::{Path, PathBuf};

use super::error::ConfigError;
use super::types::AppConfig;

const CONFIG_DIR_NAME: &str = "chatloop";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub path: PathBuf,
    pub config_exists: bool,
}

/// `<platform config dir>/chatloop/config.toml`
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let dir = dirs::config_dir().ok_or(ConfigError::MissingConfigDir)?;
    Ok(dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Loads the config file, falling back to defaults when it does not exist.
pub fn load_config(path_override: Option<PathBuf>) -> Result<LoadedConfig, ConfigError> {
    let path = match path_override {
        Some(path) => path,
        None => default_config_path()?,
    };
    match read_config(&path)? {
        Some(config) => Ok(LoadedConfig {
            config,
            path,
            config_exists: true,
        }),
        None => {
            log::debug!("no config at {}, using defaults", path.display());
            Ok(LoadedConfig {
                config: AppConfig::default(),
                path,
                config_exists: false,
            })
        }
    }
}

pub fn parse_config(contents: &str) -> Result<AppConfig, ConfigError> {
    Ok(toml::from_str(contents)?)
}

fn read_config(path: &Path) -> Result<Option<AppConfig>, ConfigError> {
    match fs::read_to_string(path) {
        Ok(contents) => parse_config(&contents).map(Some),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(ConfigError::Io(err)),
    }
}
