//! Configuration loading, validation, and management for codeloop.
//!
//! Loads configuration from `~/.codeloop/config.toml` with environment
//! variable overrides. Validates all settings at startup.

pub mod prompts;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use prompts::{FinalAnswerTemplates, ManagedAgentTemplates, PlanningTemplates, PromptTemplates};

/// The root configuration structure.
///
/// Maps directly to `~/.codeloop/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Agent loop limits and behavior
    #[serde(default)]
    pub agent: AgentSettings,

    /// Streaming bridge cadence
    #[serde(default)]
    pub streaming: StreamingSettings,

    /// Prompt templates
    #[serde(default)]
    pub prompts: PromptTemplates,
}

/// Settings for one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Maximum ReAct steps per run
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// Generate a plan on step 1 and every N steps after
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planning_interval: Option<u32>,

    /// Append a transcript of the agent's work when it reports to a manager
    #[serde(default)]
    pub provide_run_summary: bool,

    /// Maximum characters kept from execution logs, outputs, and summaries
    #[serde(default = "default_max_output_chars")]
    pub max_output_chars: usize,

    /// Modules generated code may import
    #[serde(default = "default_authorized_imports")]
    pub authorized_imports: Vec<String>,
}

fn default_max_steps() -> u32 {
    5
}
fn default_max_output_chars() -> usize {
    20_000
}
fn default_authorized_imports() -> Vec<String> {
    [
        "collections",
        "datetime",
        "itertools",
        "json",
        "math",
        "queue",
        "random",
        "re",
        "statistics",
        "time",
        "unicodedata",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            planning_interval: None,
            provide_run_summary: false,
            max_output_chars: default_max_output_chars(),
            authorized_imports: default_authorized_imports(),
        }
    }
}

/// How the streaming bridge polls the observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamingSettings {
    /// Sleep between observer drains while the run is alive
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Delay between events of a small batch
    #[serde(default = "default_event_interval_ms")]
    pub event_interval_ms: u64,

    /// Batches at least this large are yielded without per-event delay
    #[serde(default = "default_burst_threshold")]
    pub burst_threshold: usize,
}

fn default_poll_interval_ms() -> u64 {
    100
}
fn default_event_interval_ms() -> u64 {
    50
}
fn default_burst_threshold() -> usize {
    8
}

impl StreamingSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn event_interval(&self) -> Duration {
        Duration::from_millis(self.event_interval_ms)
    }
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            event_interval_ms: default_event_interval_ms(),
            burst_threshold: default_burst_threshold(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path, with env var overrides.
    ///
    /// Priority: env vars > config file > defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if let Ok(raw) = std::env::var("CODELOOP_MAX_STEPS") {
            match raw.parse::<u32>() {
                Ok(steps) => config.agent.max_steps = steps,
                Err(_) => tracing::warn!(value = %raw, "Ignoring invalid CODELOOP_MAX_STEPS"),
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".codeloop")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.max_steps == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_steps must be at least 1".into(),
            ));
        }

        if self.agent.planning_interval == Some(0) {
            return Err(ConfigError::ValidationError(
                "agent.planning_interval must be at least 1 when set".into(),
            ));
        }

        if self.agent.max_output_chars < 64 {
            return Err(ConfigError::ValidationError(
                "agent.max_output_chars must be at least 64".into(),
            ));
        }

        if self.streaming.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "streaming.poll_interval_ms must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `config init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.agent.max_steps, 5);
        assert_eq!(config.agent.max_output_chars, 20_000);
        assert_eq!(config.streaming.burst_threshold, 8);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn zero_max_steps_rejected() {
        let mut config = AppConfig::default();
        config.agent.max_steps = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_planning_interval_rejected() {
        let mut config = AppConfig::default();
        config.agent.planning_interval = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert_eq!(result.unwrap(), AppConfig::default());
    }

    #[test]
    fn load_from_file_with_partial_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[agent]
max_steps = 12
planning_interval = 3

[streaming]
poll_interval_ms = 20
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.agent.max_steps, 12);
        assert_eq!(config.agent.planning_interval, Some(3));
        assert_eq!(config.streaming.poll_interval(), Duration::from_millis(20));
        assert_eq!(config.streaming.event_interval_ms, 50);
        assert_eq!(config.prompts, PromptTemplates::default());
    }

    #[test]
    fn invalid_file_reports_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[agent\nmax_steps = ").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("max_steps = 5"));
        assert!(toml_str.contains("poll_interval_ms = 100"));
    }
}
