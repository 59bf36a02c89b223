use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::chatbot::engine::ServiceConfig;
use crate::chatbot::sessions::DEFAULT_TOKEN_TTL_MINUTES;
use crate::trainer::{TrainerConfig, DEFAULT_MAX_FEATURES, DEFAULT_THRESHOLD, DEFAULT_TOP_TERMS};

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    /// Directory for state files (database, logs). Defaults to current directory.
    data_dir: Option<String>,
    /// SQLite file. Defaults to `<data_dir>/botforge.db`.
    database_path: Option<String>,
    /// Address for the webhook listener, e.g. "0.0.0.0:8080". Disabled if unset.
    webhook_addr: Option<String>,
    /// Telegram token for long polling. Requires `telegram_bot_id`.
    telegram_bot_token: Option<String>,
    /// Managed bot that answers Telegram messages.
    telegram_bot_id: Option<i64>,
    #[serde(default = "default_threshold")]
    response_threshold: f64,
    #[serde(default = "default_max_features")]
    max_features: usize,
    #[serde(default = "default_top_terms")]
    top_terms: usize,
    /// Lifetime of access tokens issued by `POST /token`.
    #[serde(default = "default_token_ttl")]
    token_ttl_minutes: i64,
    #[serde(default)]
    dry_run: bool,
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

fn default_max_features() -> usize {
    DEFAULT_MAX_FEATURES
}

fn default_top_terms() -> usize {
    DEFAULT_TOP_TERMS
}

fn default_token_ttl() -> i64 {
    DEFAULT_TOKEN_TTL_MINUTES
}

/// Telegram long-polling settings.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub token: String,
    pub bot_id: i64,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory for state files (database, logs).
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
    pub webhook_addr: Option<String>,
    pub telegram: Option<TelegramConfig>,
    pub trainer: TrainerConfig,
    pub token_ttl_minutes: i64,
    pub dry_run: bool,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile { path: path.to_path_buf(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: path.to_path_buf(), source: e })?;

        if !(0.0..=1.0).contains(&file.response_threshold) {
            return Err(ConfigError::Validation("response_threshold must be between 0 and 1".into()));
        }
        if file.max_features == 0 {
            return Err(ConfigError::Validation("max_features must be greater than 0".into()));
        }
        if file.top_terms == 0 {
            return Err(ConfigError::Validation("top_terms must be greater than 0".into()));
        }
        if file.token_ttl_minutes <= 0 {
            return Err(ConfigError::Validation("token_ttl_minutes must be greater than 0".into()));
        }

        let telegram = match (file.telegram_bot_token, file.telegram_bot_id) {
            (None, None) => None,
            (Some(token), Some(bot_id)) => {
                // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
                let token_parts: Vec<&str> = token.split(':').collect();
                if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
                    return Err(ConfigError::Validation(
                        "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into()
                    ));
                }
                Some(TelegramConfig { token, bot_id })
            }
            (Some(_), None) => {
                return Err(ConfigError::Validation("telegram_bot_token requires telegram_bot_id".into()));
            }
            (None, Some(_)) => {
                return Err(ConfigError::Validation("telegram_bot_id requires telegram_bot_token".into()));
            }
        };

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let database_path = file
            .database_path
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("botforge.db"));

        Ok(Self {
            data_dir,
            database_path,
            webhook_addr: file.webhook_addr,
            telegram,
            trainer: TrainerConfig {
                max_features: file.max_features,
                top_terms: file.top_terms,
                threshold: file.response_threshold,
            },
            token_ttl_minutes: file.token_ttl_minutes,
            dry_run: file.dry_run,
        })
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            trainer: self.trainer,
            token_ttl_minutes: self.token_ttl_minutes,
            dry_run: self.dry_run,
        }
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}
