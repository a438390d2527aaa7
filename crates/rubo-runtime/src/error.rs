//! Runtime error types.
//!
//! Only two classes end the process, both before the robot starts running:
//! an adapter that cannot be resolved and a plugin that fails to load.

use rubo_core::{AdapterError, LoadError};
use thiserror::Error;

use crate::config::ConfigError;
use crate::logging::LoggingError;

/// Errors that can occur while starting or running the robot.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The logging subscriber could not be installed.
    #[error(transparent)]
    Logging(#[from] LoggingError),

    /// No adapter factory is registered under the configured name.
    #[error("Adapter '{name}' is not available (registered: {available:?})")]
    AdapterUnavailable { name: String, available: Vec<String> },

    /// A plugin failed during registration.
    #[error(transparent)]
    PluginLoad(#[from] LoadError),

    /// The adapter failed to start or stopped with an error.
    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
