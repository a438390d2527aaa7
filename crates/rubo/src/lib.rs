//! # Rubo
//!
//! A chat bot framework built around an ordered listener dispatcher.
//!
//! ## Overview
//!
//! A robot receives messages from a transport adapter and offers each one to
//! its listeners in registration order:
//!
//! ```text
//! ┌─────────┐     ┌───────┐     ┌────────────────────────────┐
//! │ Adapter │────▶│ Robot │────▶│ hear    "(?i)badger"       │
//! │ (shell) │     │       │────▶│ respond "(?i)ping$"        │
//! └─────────┘     └───────┘────▶│ catch_all                  │
//!                                └────────────────────────────┘
//! ```
//!
//! - **hear** listeners match anywhere in a text message
//! - **respond** listeners only match messages addressed to the robot by name
//!   or alias (`rubo ping`, `Rubo: ping`, `/ping`)
//! - **catch_all** listeners run for messages nothing else matched
//! - a handler calling [`Response::finish`](core::Response::finish) stops the
//!   remaining listeners
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rubo::prelude::*;
//!
//! fn register(robot: &mut Robot, _ctx: &PluginLoadContext) -> Result<(), BoxError> {
//!     robot.respond("(?i)ping$", |_res: Response| async { "PONG".to_string() })?;
//!     Ok(())
//! }
//!
//! static PING: PluginDescriptor = define_plugin! { name: "ping", register: register };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), RuntimeError> {
//!     RuboRuntime::builder()
//!         .adapter("shell", |_| Ok(Arc::new(ShellAdapter::default()) as BoxedAdapter))
//!         .plugin(&PING)
//!         .build()?
//!         .run()
//!         .await
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use rubo_core as core;
pub use rubo_runtime as runtime;

pub use rubo_core::define_plugin;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use rubo::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use rubo_runtime::{RuboConfig, RuboRuntime, RuntimeError};

    // Engine
    pub use rubo_core::prelude::*;
    pub use rubo_core::{Captures, DispatchOutcome, Listener, PLUGINS};

    // Logging macros
    pub use rubo_runtime::prelude::*;
}
