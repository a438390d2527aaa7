//! Rubo Runtime - orchestration layer for the Rubo chat bot framework.
//!
//! This crate provides:
//! - Layered configuration (`RuboConfig`, `ConfigLoader`)
//! - Logging setup (`LoggingBuilder`, `init_from_config`)
//! - Adapter factories, plugin loading and the run loop (`RuboRuntime`)
//!
//! ```ignore
//! use rubo_runtime::RuboRuntime;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), rubo_runtime::RuntimeError> {
//!     RuboRuntime::builder()
//!         .adapter("shell", |_| Ok(Arc::new(ShellAdapter::default()) as BoxedAdapter))
//!         .build()?
//!         .run()
//!         .await
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{
    ConfigError, ConfigLoader, ConfigResult, LoggingConfig, PluginsConfig, RobotConfig,
    RuboConfig,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, LoggingError, SpanEvents, init_from_config};
pub use runtime::{AdapterFactory, RuboRuntime, RuntimeBuilder};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros for plugin and adapter code.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
