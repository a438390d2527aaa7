//! # Rubo Core
//!
//! The matching and dispatch engine of the Rubo chat bot framework.
//!
//! A [`Robot`] owns an ordered list of [`Listener`]s. Every inbound
//! [`Message`] is offered to each listener in registration order; matching
//! listeners run their handlers with a [`Response`] that can answer through
//! the transport [`Adapter`].
//!
//! ## Building Blocks
//!
//! - **Messages**: [`Message`], [`MessageKind`], [`User`]
//! - **Patterns**: [`ResponderPattern`] for robot-directed text, [`Captures`]
//! - **Listeners**: [`Listener`], [`into_handler`], [`IntoHandlerResult`]
//! - **Dispatcher**: [`Robot`], [`RobotBuilder`], [`DispatchOutcome`]
//! - **Events**: [`EventEmitter`], [`RobotEvent`], [`ErrorEvent`]
//! - **Help**: [`CommandRegistry`], [`HelpDocumentation`]
//! - **Plugins**: [`PluginDescriptor`], [`PluginLoadContext`], [`PLUGINS`]
//! - **Collaborators**: [`Adapter`], [`Brain`], [`MemoryBrain`]
//!
//! ## Dispatch Flow
//!
//! ```text
//! ┌─────────┐     ┌───────┐     ┌──────────┐  no match  ┌───────────┐
//! │ Adapter │────▶│ Robot │────▶│ Listener │───────────▶│ catch-all │
//! └─────────┘     └───────┘────▶│ Listener │            └───────────┘
//!                     │         └──────────┘
//!                     └── error ──▶ error handlers
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use rubo_core::prelude::*;
//!
//! let mut robot = Robot::builder("Rubo", adapter).alias("/").build();
//! robot.respond("(?i)ping$", |_res| async { "PONG".to_string() })?;
//! robot.error(|err, _res| async move {
//!     eprintln!("dispatch failed: {err}");
//! });
//!
//! let robot = Arc::new(robot);
//! robot.receive(Message::text(User::new("1", "alice"), "rubo ping")).await;
//! ```

pub mod adapter;
pub mod commands;
pub mod emitter;
pub mod error;
pub mod listener;
pub mod message;
pub mod pattern;
pub mod plugin;
pub mod response;
pub mod robot;

pub use adapter::{Adapter, BoxedAdapter, BoxedBrain, Brain, Envelope, MemoryBrain};
pub use commands::{CommandRegistry, HelpDocumentation};
pub use emitter::{EventEmitter, EventHandler};
pub use error::{
    AdapterError, AdapterResult, BoxError, BrainError, BrainResult, DispatchError, HandlerResult,
    LoadError, PatternError,
};
pub use listener::{BoxedHandler, HandlerOutput, IntoHandlerResult, Listener, MatchFn, into_handler};
pub use message::{Message, MessageKind, User};
pub use pattern::{Captures, ResponderPattern};
pub use plugin::{PLUGINS, PluginDescriptor, PluginLoadContext, RegisterFn, discovered_plugins};
pub use response::Response;
pub use robot::{
    CONNECTED, DispatchOutcome, ERROR, ErrorEvent, ErrorHandler, RUNNING, Robot, RobotBuilder,
    RobotEvent,
};

pub use async_trait::async_trait;
pub use futures::future::BoxFuture;
pub use linkme;

/// Prelude for common imports.
pub mod prelude {
    pub use super::adapter::{Adapter, BoxedAdapter, Brain, Envelope};
    pub use super::error::{AdapterError, AdapterResult, BoxError, DispatchError, HandlerResult};
    pub use super::message::{Message, MessageKind, User};
    pub use super::plugin::{PluginDescriptor, PluginLoadContext};
    pub use super::response::Response;
    pub use super::robot::{Robot, RobotEvent};
    pub use super::{BoxFuture, async_trait, define_plugin};
    pub use std::sync::Arc;
}
