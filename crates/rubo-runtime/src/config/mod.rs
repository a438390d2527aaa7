//! Configuration for the Rubo runtime.
//!
//! [`RuboConfig`] is assembled by [`ConfigLoader`] from defaults, files,
//! `RUBO_*` environment variables and programmatic overrides, then checked
//! by [`validate_config`].

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, PluginsConfig, RobotConfig,
    RuboConfig, SpanEventConfig,
};
pub use validation::validate_config;
