//! Statically linked plugins.
//!
//! A plugin is a [`PluginDescriptor`]: a name, a registration function that
//! receives the robot during the load phase, and an optional help source.
//! Descriptors are either passed explicitly to the runtime or contributed to
//! the link-time [`PLUGINS`] registry:
//!
//! ```rust,ignore
//! use rubo_core::{PLUGINS, PluginDescriptor, PluginLoadContext, Robot, define_plugin};
//! use rubo_core::linkme::distributed_slice;
//!
//! fn register(robot: &mut Robot, _ctx: &PluginLoadContext) -> Result<(), rubo_core::BoxError> {
//!     robot.respond("(?i)ping$", |_res| async { "PONG".to_string() })?;
//!     Ok(())
//! }
//!
//! #[distributed_slice(PLUGINS)]
//! #[linkme(crate = rubo_core::linkme)]
//! static PING: PluginDescriptor = define_plugin! {
//!     name: "ping",
//!     register: register,
//!     help: include_str!("ping.rs"),
//! };
//! ```

use std::sync::Arc;

use linkme::distributed_slice;
use serde_json::Value;

use crate::error::BoxError;
use crate::robot::Robot;

/// Registration entry point of a plugin.
pub type RegisterFn = fn(&mut Robot, &PluginLoadContext) -> Result<(), BoxError>;

/// A static, `Copy` handle to a plugin.
#[derive(Debug, Clone, Copy)]
pub struct PluginDescriptor {
    /// Plugin name, used in logs and as the configuration key.
    pub name: &'static str,

    /// Called once, before the robot starts running.
    pub register: RegisterFn,

    /// Source text whose leading comment block documents the plugin's commands.
    pub help: Option<&'static str>,
}

/// Link-time registry of plugins.
///
/// Every crate linked into the final binary can contribute descriptors.
#[distributed_slice]
pub static PLUGINS: [PluginDescriptor];

/// Returns every plugin contributed to [`PLUGINS`], sorted by name.
pub fn discovered_plugins() -> Vec<&'static PluginDescriptor> {
    let mut plugins: Vec<_> = PLUGINS.iter().collect();
    plugins.sort_by_key(|p| p.name);
    plugins
}

/// Context passed to a plugin's registration function.
///
/// Carries the plugin's configuration section (`plugins.settings.<name>`),
/// or JSON `null` when the section is absent.
#[derive(Clone, Debug)]
pub struct PluginLoadContext {
    plugin_config: Arc<Value>,
}

impl Default for PluginLoadContext {
    fn default() -> Self {
        Self::new(Value::Null)
    }
}

impl PluginLoadContext {
    /// Creates a context around a configuration value.
    pub fn new(plugin_config: Value) -> Self {
        Self {
            plugin_config: Arc::new(plugin_config),
        }
    }

    /// The raw configuration section.
    pub fn raw_config(&self) -> &Value {
        &self.plugin_config
    }

    /// Deserialises the configuration section into `T`.
    ///
    /// A missing section deserialises like an empty object, so structs with
    /// `#[serde(default)]` fields always succeed.
    pub fn get_config<T>(&self) -> serde_json::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        match self.plugin_config.as_ref() {
            Value::Null => T::deserialize(&Value::Object(Default::default())),
            value => T::deserialize(value),
        }
    }
}

/// Builds a [`PluginDescriptor`].
///
/// ```rust,ignore
/// static ECHO: PluginDescriptor = define_plugin! {
///     name: "echo",
///     register: register_echo,
/// };
/// ```
#[macro_export]
macro_rules! define_plugin {
    (
        name: $name:expr,
        register: $register:expr
        $(, help: $help:expr)?
        $(,)?
    ) => {
        $crate::plugin::PluginDescriptor {
            name: $name,
            register: $register,
            help: $crate::__plugin_help!($($help)?),
        }
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! __plugin_help {
    () => {
        ::std::option::Option::None
    };
    ($help:expr) => {
        ::std::option::Option::Some($help)
    };
}
