//! Startup, run loop and shutdown.
//!
//! ```rust,ignore
//! use rubo_runtime::RuboRuntime;
//!
//! let runtime = RuboRuntime::builder()
//!     .adapter("shell", |_settings| Ok(Arc::new(ShellAdapter::new()) as BoxedAdapter))
//!     .plugin(&PING)
//!     .build()?;
//!
//! // Runs until the adapter stops or Ctrl+C is received
//! runtime.run().await?;
//! ```
//!
//! Startup order:
//!
//! 1. Load configuration and install logging
//! 2. Resolve the configured adapter (fatal if unknown)
//! 3. Build the robot and load every enabled plugin in order (first failure
//!    is fatal)
//! 4. Emit `running` and drive the adapter until it stops or a shutdown
//!    signal arrives
//! 5. Close the adapter and the brain

use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use rubo_core::{
    AdapterResult, BoxedAdapter, BoxedBrain, CONNECTED, PluginDescriptor, PluginLoadContext,
    Robot, discovered_plugins,
};
use serde_json::Value;
use tokio::signal;
use tracing::{debug, error, info, info_span, warn};

use crate::config::{ConfigLoader, RuboConfig};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging::{self, LoggingError};

/// Creates an adapter from its `adapters.<name>` settings (`null` if absent).
pub type AdapterFactory = Arc<dyn Fn(&Value) -> AdapterResult<BoxedAdapter> + Send + Sync>;

/// Owns the configuration, the adapter factories and the plugin list.
pub struct RuboRuntime {
    config: RuboConfig,
    adapters: BTreeMap<String, AdapterFactory>,
    plugins: Vec<&'static PluginDescriptor>,
    discover_plugins: bool,
    brain: Option<BoxedBrain>,
}

impl RuboRuntime {
    /// Creates a runtime builder.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// The loaded configuration.
    pub fn config(&self) -> &RuboConfig {
        &self.config
    }

    /// Names of the registered adapter factories.
    pub fn adapter_names(&self) -> Vec<String> {
        self.adapters.keys().cloned().collect()
    }

    /// Plugins in load order: explicit ones first, then discovered ones not
    /// already listed.
    pub fn plugins(&self) -> Vec<&'static PluginDescriptor> {
        let mut plugins = self.plugins.clone();
        if self.discover_plugins {
            for plugin in discovered_plugins() {
                if plugins.iter().all(|p| p.name != plugin.name) {
                    plugins.push(plugin);
                }
            }
        }
        plugins
    }

    fn create_adapter(&self) -> RuntimeResult<BoxedAdapter> {
        let name = &self.config.robot.adapter;
        let Some(factory) = self.adapters.get(name) else {
            return Err(RuntimeError::AdapterUnavailable {
                name: name.clone(),
                available: self.adapter_names(),
            });
        };
        let settings = self.config.adapters.get(name).cloned().unwrap_or(Value::Null);
        let adapter = factory(&settings)?;
        info!(adapter = %name, "Adapter created");
        Ok(adapter)
    }

    /// Resolves the adapter, builds the robot and loads the enabled plugins.
    pub fn build_robot(&self) -> RuntimeResult<Robot> {
        let adapter = self.create_adapter()?;
        let robot_config = &self.config.robot;

        let mut builder = Robot::builder(robot_config.name.as_str(), adapter)
            .maybe_alias(robot_config.alias.clone())
            .span(info_span!("robot", name = %robot_config.name));
        if let Some(brain) = &self.brain {
            builder = builder.brain(Arc::clone(brain));
        }
        let mut robot = builder.build();

        for plugin in self.plugins() {
            if !self.config.plugins.is_enabled(plugin.name) {
                info!(plugin = plugin.name, "Plugin disabled, skipping");
                continue;
            }
            let ctx = PluginLoadContext::new(self.config.plugins.settings_for(plugin.name));
            robot.load_plugin(plugin, &ctx)?;
        }

        info!(
            robot = %robot.name(),
            alias = ?robot.alias(),
            listeners = robot.listener_count(),
            commands = robot.commands().len(),
            "Robot ready"
        );
        Ok(robot)
    }

    /// Runs until the adapter stops or Ctrl+C / SIGTERM is received.
    pub async fn run(self) -> RuntimeResult<()> {
        self.run_until(wait_for_shutdown()).await
    }

    /// Runs until the adapter stops or `shutdown` completes.
    pub async fn run_until<F>(self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let robot = Arc::new(self.build_robot()?);

        let name = robot.name().to_string();
        robot.events().once(CONNECTED, move |_| {
            let name = name.clone();
            Box::pin(async move {
                info!(robot = %name, "Adapter connected");
            })
        });

        info!("Rubo is running. Press Ctrl+C to stop.");
        let outcome = tokio::select! {
            result = Arc::clone(&robot).run() => {
                match &result {
                    Ok(()) => info!("Adapter stopped"),
                    Err(e) => error!(error = %e, "Adapter stopped with an error"),
                }
                result.map_err(RuntimeError::from)
            }
            () = shutdown => {
                info!("Shutdown requested");
                Ok(())
            }
        };

        robot.shutdown().await;
        outcome
    }
}

/// Waits for Ctrl+C, or SIGTERM on unix.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
                return;
            }
            Err(e) => warn!(error = %e, "Failed to register SIGTERM handler"),
        }
    }

    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            error!(error = %e, "Failed to listen for Ctrl+C, running until the adapter stops");
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for [`RuboRuntime`].
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    config: Option<RuboConfig>,
    adapters: BTreeMap<String, AdapterFactory>,
    plugins: Vec<&'static PluginDescriptor>,
    discover_plugins: bool,
    brain: Option<BoxedBrain>,
    init_logging: bool,
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeBuilder {
    /// Creates a builder that loads configuration from the current directory
    /// and `<user config dir>/rubo`.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir().with_user_config_dir(),
            config: None,
            adapters: BTreeMap::new(),
            plugins: Vec::new(),
            discover_plugins: true,
            brain: None,
            init_logging: true,
        }
    }

    /// Uses this configuration instead of loading one.
    pub fn config(mut self, config: RuboConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Loads exactly this configuration file.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a configuration search directory.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Disables `RUBO_*` environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Registers an adapter factory under `name`.
    pub fn adapter<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Value) -> AdapterResult<BoxedAdapter> + Send + Sync + 'static,
    {
        self.adapters.insert(name.into(), Arc::new(factory));
        self
    }

    /// Adds a plugin to the explicit load list.
    pub fn plugin(mut self, plugin: &'static PluginDescriptor) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Adds several plugins to the explicit load list.
    pub fn plugins<I>(mut self, plugins: I) -> Self
    where
        I: IntoIterator<Item = &'static PluginDescriptor>,
    {
        self.plugins.extend(plugins);
        self
    }

    /// Whether plugins contributed to the link-time registry are loaded too.
    /// Enabled by default.
    pub fn discover_plugins(mut self, enabled: bool) -> Self {
        self.discover_plugins = enabled;
        self
    }

    /// Replaces the default in-memory brain.
    pub fn brain(mut self, brain: BoxedBrain) -> Self {
        self.brain = Some(brain);
        self
    }

    /// Whether `build` installs the global logging subscriber. Enabled by
    /// default.
    pub fn init_logging(mut self, enabled: bool) -> Self {
        self.init_logging = enabled;
        self
    }

    /// Loads the configuration, installs logging and builds the runtime.
    pub fn build(self) -> RuntimeResult<RuboRuntime> {
        let config = match self.config {
            Some(config) => {
                crate::config::validate_config(&config)?;
                config
            }
            None => self.config_loader.load()?,
        };

        if self.init_logging {
            match logging::init_from_config(&config.logging) {
                Ok(()) => {}
                Err(LoggingError::AlreadyInitialized(_)) => {
                    debug!("Logging already initialized, keeping the existing subscriber");
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!(
            robot = %config.robot.name,
            adapter = %config.robot.adapter,
            log_level = %config.logging.level,
            "Runtime initialized from configuration"
        );

        Ok(RuboRuntime {
            config,
            adapters: self.adapters,
            plugins: self.plugins,
            discover_plugins: self.discover_plugins,
            brain: self.brain,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rubo_core::{
        Adapter, AdapterError, BoxError, Envelope, LoadError, Message, Response, User,
        async_trait, define_plugin,
    };
    use parking_lot::Mutex;
    use serde::Deserialize;

    #[derive(Default)]
    struct TestAdapter {
        sent: Mutex<Vec<String>>,
        closed: AtomicUsize,
        fail_on_run: bool,
    }

    #[async_trait]
    impl Adapter for TestAdapter {
        fn name(&self) -> &str {
            "test"
        }

        async fn send(&self, _envelope: &Envelope, strings: &[String]) -> AdapterResult<()> {
            self.sent.lock().extend_from_slice(strings);
            Ok(())
        }

        async fn run(&self, robot: Arc<Robot>) -> AdapterResult<()> {
            if self.fail_on_run {
                return Err(AdapterError::NotConnected);
            }
            robot.events().emit(CONNECTED, rubo_core::RobotEvent::Connected).await;
            std::future::pending::<()>().await;
            Ok(())
        }

        async fn close(&self) -> AdapterResult<()> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct EchoSettings {
        prefix: String,
    }

    fn register_echo(robot: &mut Robot, ctx: &PluginLoadContext) -> Result<(), BoxError> {
        let settings: EchoSettings = ctx.get_config()?;
        let prefix = Arc::new(settings.prefix);
        robot.respond("(?i)echo (.+)$", move |res: Response| {
            let prefix = Arc::clone(&prefix);
            async move { format!("{prefix}{}", res.group(1).unwrap_or_default()) }
        })?;
        Ok(())
    }

    fn register_broken(_robot: &mut Robot, _ctx: &PluginLoadContext) -> Result<(), BoxError> {
        Err("no credentials".into())
    }

    static ECHO: PluginDescriptor = define_plugin! {
        name: "echo",
        register: register_echo,
        help: "// Commands:\n//   rubo echo <text> - Reply with <text>\n",
    };

    static BROKEN: PluginDescriptor = define_plugin! {
        name: "broken",
        register: register_broken,
    };

    fn config() -> RuboConfig {
        let mut config = RuboConfig::default();
        config.robot.adapter = "test".into();
        config
    }

    fn builder(config: RuboConfig, adapter: Arc<TestAdapter>) -> RuntimeBuilder {
        RuboRuntime::builder()
            .config(config)
            .init_logging(false)
            .discover_plugins(false)
            .adapter("test", move |_settings| Ok(Arc::clone(&adapter) as BoxedAdapter))
    }

    fn text(body: &str) -> Message {
        Message::text(User::new("1", "alice"), body)
    }

    #[test]
    fn test_unknown_adapter_is_fatal() {
        let mut config = config();
        config.robot.adapter = "irc".into();
        let runtime = builder(config, Arc::default()).build().unwrap();

        match runtime.build_robot() {
            Err(RuntimeError::AdapterUnavailable { name, available }) => {
                assert_eq!(name, "irc");
                assert_eq!(available, vec!["test"]);
            }
            other => panic!("expected AdapterUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn test_failing_plugin_is_fatal() {
        let runtime = builder(config(), Arc::default())
            .plugin(&ECHO)
            .plugin(&BROKEN)
            .build()
            .unwrap();

        let err = runtime.build_robot().unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::PluginLoad(LoadError::Failed { plugin: "broken", .. })
        ));
    }

    #[test]
    fn test_disabled_plugin_is_skipped() {
        let mut config = config();
        config.plugins.disabled.push("broken".into());
        let runtime = builder(config, Arc::default())
            .plugins([&ECHO, &BROKEN])
            .build()
            .unwrap();

        let robot = runtime.build_robot().unwrap();
        assert_eq!(robot.listener_count(), 1);
        assert_eq!(robot.help_commands(), vec!["rubo echo <text> - Reply with <text>"]);
    }

    #[test]
    fn test_invalid_explicit_config_is_rejected() {
        let mut config = config();
        config.robot.name = String::new();
        assert!(matches!(
            builder(config, Arc::default()).build(),
            Err(RuntimeError::Config(_))
        ));
    }

    #[cfg(all(target_os = "linux", feature = "toml-config"))]
    #[test]
    fn test_builder_searches_user_config_dir() {
        figment::Jail::expect_with(|jail| {
            std::fs::create_dir_all("xdg/rubo").map_err(|e| e.to_string())?;
            jail.create_file("xdg/rubo/rubo.toml", "[robot]\nname = \"Bender\"\n")?;
            jail.set_env("XDG_CONFIG_HOME", jail.directory().join("xdg").display());

            let runtime = RuboRuntime::builder()
                .without_env()
                .init_logging(false)
                .build()
                .map_err(|e| e.to_string())?;
            assert_eq!(runtime.config().robot.name, "Bender");
            Ok(())
        });
    }

    #[tokio::test]
    async fn test_plugin_receives_its_settings() {
        let mut config = config();
        config.robot.alias = Some("/".into());
        config
            .plugins
            .settings
            .insert("echo".into(), serde_json::json!({ "prefix": "> " }));
        let adapter = Arc::new(TestAdapter::default());
        let runtime = builder(config, Arc::clone(&adapter))
            .plugin(&ECHO)
            .build()
            .unwrap();

        let robot = runtime.build_robot().unwrap();
        robot.receive(text("/echo hello")).await;

        assert_eq!(*adapter.sent.lock(), vec!["> hello"]);
    }

    #[tokio::test]
    async fn test_run_until_shutdown_closes_adapter() {
        let adapter = Arc::new(TestAdapter::default());
        let runtime = builder(config(), Arc::clone(&adapter)).build().unwrap();

        runtime
            .run_until(tokio::time::sleep(std::time::Duration::from_millis(10)))
            .await
            .unwrap();

        assert_eq!(adapter.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_adapter_failure_is_reported() {
        let adapter = Arc::new(TestAdapter {
            fail_on_run: true,
            ..Default::default()
        });
        let runtime = builder(config(), Arc::clone(&adapter)).build().unwrap();

        let result = runtime.run_until(std::future::pending()).await;

        assert!(matches!(result, Err(RuntimeError::Adapter(AdapterError::NotConnected))));
        assert_eq!(adapter.closed.load(Ordering::SeqCst), 1);
    }
}
