use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid yaml in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("settings validation failed: {0}")]
    Settings(String),
}

fn default_backend_timeout() -> u64 {
    10
}

fn default_oracle_api_base() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_oracle_timeout() -> u64 {
    30
}

fn default_max_turns() -> usize {
    10
}

fn default_history_turns() -> usize {
    6
}

fn default_history_chars() -> usize {
    4000
}

fn default_idle_timeout() -> u64 {
    30 * 60
}

fn default_max_sessions() -> usize {
    256
}

/// Backend internal API the bridge calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendSettings {
    pub base_url: String,
    pub internal_api_key: String,
    #[serde(default = "default_backend_timeout")]
    pub timeout_seconds: u64,
}

impl BackendSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Chat-completions endpoint used as the classification oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleSettings {
    #[serde(default = "default_oracle_api_base")]
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    #[serde(default = "default_oracle_timeout")]
    pub timeout_seconds: u64,
}

impl OracleSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSettings {
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,
    #[serde(default = "default_history_chars")]
    pub history_chars: usize,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            history_turns: default_history_turns(),
            history_chars: default_history_chars(),
            idle_timeout_seconds: default_idle_timeout(),
            max_sessions: default_max_sessions(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub backend: BackendSettings,
    pub oracle: OracleSettings,
    #[serde(default)]
    pub session: SessionSettings,
    /// Root for file-append engine logs; logging is disabled when unset.
    #[serde(default)]
    pub state_root: Option<PathBuf>,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let settings: Settings =
            serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.base_url.trim().is_empty() {
            return Err(ConfigError::Settings(
                "backend.baseUrl must be non-empty".to_string(),
            ));
        }
        if self.backend.timeout_seconds == 0 {
            return Err(ConfigError::Settings(
                "backend.timeoutSeconds must be greater than zero".to_string(),
            ));
        }
        if self.oracle.api_base.trim().is_empty() {
            return Err(ConfigError::Settings(
                "oracle.apiBase must be non-empty".to_string(),
            ));
        }
        if self.oracle.model.trim().is_empty() {
            return Err(ConfigError::Settings(
                "oracle.model must be non-empty".to_string(),
            ));
        }
        if self.oracle.timeout_seconds == 0 {
            return Err(ConfigError::Settings(
                "oracle.timeoutSeconds must be greater than zero".to_string(),
            ));
        }
        if self.session.max_turns == 0 {
            return Err(ConfigError::Settings(
                "session.maxTurns must be greater than zero".to_string(),
            ));
        }
        if self.session.max_sessions == 0 {
            return Err(ConfigError::Settings(
                "session.maxSessions must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
