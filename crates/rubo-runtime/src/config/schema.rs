//! Configuration schema definitions.
//!
//! ```toml
//! [robot]
//! name = "Rubo"
//! alias = "/"
//! adapter = "shell"
//!
//! [logging]
//! level = "debug"
//! format = "pretty"
//!
//! [logging.filters]
//! rubo_core = "trace"
//!
//! [adapters.shell]
//! prompt = "> "
//!
//! [plugins]
//! disabled = ["catch_all"]
//!
//! [plugins.settings.echo]
//! prefix = ">> "
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RuboConfig {
    /// Identity of the robot and the adapter it runs on.
    #[serde(default)]
    pub robot: RobotConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Adapter-specific settings, keyed by adapter name.
    #[serde(default)]
    pub adapters: HashMap<String, Value>,

    /// Plugin selection and settings.
    #[serde(default)]
    pub plugins: PluginsConfig,
}

// =============================================================================
// Robot
// =============================================================================

/// Robot identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotConfig {
    /// Name directed messages must start with.
    #[serde(default = "default_robot_name")]
    pub name: String,

    /// Alternative prefix accepted in place of the name.
    #[serde(default)]
    pub alias: Option<String>,

    /// Name of the adapter factory to run on.
    #[serde(default = "default_adapter")]
    pub adapter: String,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            name: default_robot_name(),
            alias: None,
            adapter: default_adapter(),
        }
    }
}

fn default_robot_name() -> String {
    "Rubo".to_string()
}

fn default_adapter() -> String {
    "shell".to_string()
}

// =============================================================================
// Plugins
// =============================================================================

/// Plugin selection.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PluginsConfig {
    /// Plugins that are known but must not be loaded.
    #[serde(default)]
    pub disabled: Vec<String>,

    /// Per-plugin settings, handed to the plugin at load time.
    #[serde(default)]
    pub settings: HashMap<String, Value>,
}

impl PluginsConfig {
    /// Whether `name` may be loaded.
    pub fn is_enabled(&self, name: &str) -> bool {
        !self.disabled.iter().any(|d| d == name)
    }

    /// The settings section for `name`, or `null`.
    pub fn settings_for(&self, name: &str) -> Value {
        self.settings.get(name).cloned().unwrap_or(Value::Null)
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base level; `RUST_LOG` takes precedence when set.
    #[serde(default)]
    pub level: LogLevel,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Output destination.
    #[serde(default)]
    pub output: LogOutput,

    /// Span lifecycle events to log.
    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Include thread ids.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line.
    #[serde(default)]
    pub file_location: bool,

    /// Log file, required when `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Rotation period of the log file.
    #[serde(default)]
    pub rotation: LogRotation,

    /// Number of rotated files to keep.
    #[serde(default = "default_max_files")]
    pub max_files: u32,

    /// Per-module level overrides, e.g. `rubo_core = "trace"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            span_events: SpanEventConfig::default(),
            thread_ids: false,
            file_location: false,
            file_path: None,
            rotation: LogRotation::default(),
            max_files: default_max_files(),
            filters: HashMap::new(),
        }
    }
}

fn default_max_files() -> u32 {
    5
}

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Lower-case name, as used in filter directives.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// The matching `tracing` level.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Needs the `json-log` feature; falls back to `Full` otherwise.
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Log file rotation period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = RuboConfig::default();
        assert_eq!(config.robot.name, "Rubo");
        assert_eq!(config.robot.adapter, "shell");
        assert!(config.robot.alias.is_none());
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.logging.max_files, 5);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: RuboConfig = serde_json::from_value(json!({
            "robot": { "alias": "/" },
            "logging": { "level": "debug", "filters": { "rubo_core": "trace" } },
            "plugins": { "disabled": ["noisy"], "settings": { "echo": { "prefix": ">" } } }
        }))
        .unwrap();

        assert_eq!(config.robot.name, "Rubo");
        assert_eq!(config.robot.alias.as_deref(), Some("/"));
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.filters["rubo_core"], LogLevel::Trace);
        assert!(!config.plugins.is_enabled("noisy"));
        assert!(config.plugins.is_enabled("echo"));
        assert_eq!(config.plugins.settings_for("echo"), json!({ "prefix": ">" }));
        assert_eq!(config.plugins.settings_for("ping"), Value::Null);
    }

    #[test]
    fn test_log_level_names() {
        assert_eq!(LogLevel::Warn.as_str(), "warn");
        assert_eq!(LogLevel::Error.to_string(), "error");
        assert_eq!(LogLevel::Trace.to_tracing_level(), tracing::Level::TRACE);
    }
}
