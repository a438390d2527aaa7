//! The robot: listener registry and message dispatcher.
//!
//! # Dispatch
//!
//! [`Robot::receive`] runs every listener in registration order:
//!
//! 1. A listener whose matcher accepts the message gets its handler awaited.
//! 2. A failing or panicking listener is reported on the `error` event and
//!    the loop moves on to the next listener.
//! 3. Once a handler marks the message done, the remaining listeners are
//!    skipped.
//! 4. If nothing matched and the message is not already a catch-all, the
//!    message is wrapped in a catch-all and dispatched once more.
//!
//! ```rust,ignore
//! let mut robot = Robot::builder("Rubo", adapter).alias("/").build();
//!
//! robot.hear("(?i)badger", |res: Response| async move {
//!     res.send(["Badgers? BADGERS? WE DON'T NEED NO STINKIN BADGERS"]).await
//! })?;
//! robot.respond("(?i)ping$", |_res| async { "PONG".to_string() })?;
//! robot.catch_all(|res: Response| async move { res.reply(["Sorry?"]).await });
//!
//! let robot = Arc::new(robot);
//! robot.receive(Message::text(user, "rubo ping")).await;
//! ```

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use regex::Regex;
use tracing::{Instrument, Span, debug, debug_span, error, info, info_span, warn};

use crate::adapter::{BoxedAdapter, BoxedBrain, Envelope, MemoryBrain};
use crate::commands::{CommandRegistry, HelpDocumentation};
use crate::emitter::EventEmitter;
use crate::error::{
    AdapterResult, DispatchError, HandlerResult, LoadError, PatternError, panic_message,
};
use crate::listener::{IntoHandlerResult, Listener, deliver, into_handler};
use crate::message::Message;
use crate::pattern::{Captures, ResponderPattern};
use crate::plugin::{PluginDescriptor, PluginLoadContext};
use crate::response::Response;

/// Name of the event emitted once the adapter has a session.
pub const CONNECTED: &str = "connected";
/// Name of the event emitted when the robot starts running.
pub const RUNNING: &str = "running";
/// Name of the event carrying dispatch failures.
pub const ERROR: &str = "error";

// ============================================================================
// Events
// ============================================================================

/// Payload of the `error` event.
#[derive(Clone, Debug)]
pub struct ErrorEvent {
    /// What went wrong.
    pub error: Arc<DispatchError>,
    /// The response for the message being dispatched, with empty captures.
    pub response: Option<Response>,
}

/// Lifecycle events published on the robot's emitter.
#[derive(Clone, Debug)]
pub enum RobotEvent {
    /// The adapter established a session.
    Connected,
    /// The robot started its run loop.
    Running,
    /// A listener failed, or an error was published explicitly.
    Error(ErrorEvent),
}

impl RobotEvent {
    /// The emitter event name for this payload.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected => CONNECTED,
            Self::Running => RUNNING,
            Self::Error(_) => ERROR,
        }
    }
}

/// A type-erased error handler.
pub type ErrorHandler =
    Arc<dyn Fn(Arc<DispatchError>, Option<Response>) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Result of one top-level [`Robot::receive`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Whether any listener matched the message itself.
    pub matched: bool,
    /// Whether a catch-all pass was dispatched for it.
    pub catch_all: bool,
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`Robot`].
pub struct RobotBuilder {
    name: String,
    alias: Option<String>,
    adapter: BoxedAdapter,
    brain: Option<BoxedBrain>,
    span: Option<Span>,
}

impl RobotBuilder {
    /// Sets an alias accepted in place of the name by directed listeners.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Sets an optional alias.
    pub fn maybe_alias(mut self, alias: Option<String>) -> Self {
        self.alias = alias;
        self
    }

    /// Sets the brain. Defaults to a [`MemoryBrain`].
    pub fn brain(mut self, brain: BoxedBrain) -> Self {
        self.brain = Some(brain);
        self
    }

    /// Sets the span all robot diagnostics are recorded under.
    ///
    /// Defaults to `info_span!("robot", name = ...)`.
    pub fn span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Builds the robot and installs the default `error` subscriber.
    pub fn build(self) -> Robot {
        let span = self
            .span
            .unwrap_or_else(|| info_span!("robot", name = %self.name));
        let error_handlers: Arc<RwLock<Vec<ErrorHandler>>> = Arc::new(RwLock::new(Vec::new()));
        let events = EventEmitter::new();

        let handlers = Arc::clone(&error_handlers);
        let chain_span = span.clone();
        events.on(ERROR, move |event: RobotEvent| {
            let handlers = Arc::clone(&handlers);
            let span = chain_span.clone();
            Box::pin(
                async move {
                    if let RobotEvent::Error(ErrorEvent { error, response }) = event {
                        run_error_handlers(&handlers, error, response).await;
                    }
                }
                .instrument(span),
            )
        });

        Robot {
            name: self.name,
            alias: self.alias,
            listeners: Vec::new(),
            error_handlers,
            commands: CommandRegistry::new(),
            events,
            adapter: self.adapter,
            brain: self.brain.unwrap_or_else(|| Arc::new(MemoryBrain::new())),
            span,
        }
    }
}

/// Invokes every registered error handler, isolating each one.
async fn run_error_handlers(
    handlers: &RwLock<Vec<ErrorHandler>>,
    error: Arc<DispatchError>,
    response: Option<Response>,
) {
    let snapshot: Vec<ErrorHandler> = handlers.read().clone();
    if snapshot.is_empty() {
        debug!(error = %error, "No error handlers registered");
        return;
    }

    for (index, handler) in snapshot.iter().enumerate() {
        let call = AssertUnwindSafe(async { handler(Arc::clone(&error), response.clone()).await });
        match call.catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(handler_index = index, error = %e, "Error handler failed"),
            Err(panic) => error!(
                handler_index = index,
                panic = %panic_message(panic.as_ref()),
                "Error handler panicked"
            ),
        }
    }
}

// ============================================================================
// Robot
// ============================================================================

/// Owns the ordered listeners, error handlers and command help, and
/// dispatches inbound messages.
///
/// Registration takes `&mut self` and happens before the robot is shared;
/// dispatch takes `&self`.
pub struct Robot {
    name: String,
    alias: Option<String>,
    listeners: Vec<Listener>,
    error_handlers: Arc<RwLock<Vec<ErrorHandler>>>,
    commands: CommandRegistry,
    events: EventEmitter<RobotEvent>,
    adapter: BoxedAdapter,
    brain: BoxedBrain,
    span: Span,
}

impl Robot {
    /// Creates a robot builder.
    pub fn builder(name: impl Into<String>, adapter: BoxedAdapter) -> RobotBuilder {
        RobotBuilder {
            name: name.into(),
            alias: None,
            adapter,
            brain: None,
            span: None,
        }
    }

    /// Creates a robot with default settings.
    pub fn new(name: impl Into<String>, adapter: BoxedAdapter) -> Self {
        Self::builder(name, adapter).build()
    }

    /// The robot's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The robot's alias, if any.
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// The transport adapter.
    pub fn adapter(&self) -> &BoxedAdapter {
        &self.adapter
    }

    /// The brain.
    pub fn brain(&self) -> &BoxedBrain {
        &self.brain
    }

    /// The lifecycle event emitter.
    pub fn events(&self) -> &EventEmitter<RobotEvent> {
        &self.events
    }

    /// The span diagnostics are recorded under.
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    // ------------------------------------------------------------------------
    // Listener registration
    // ------------------------------------------------------------------------

    /// Appends a listener. Registration order is dispatch order.
    pub fn add_listener(&mut self, listener: Listener) -> &mut Self {
        debug!(
            parent: &self.span,
            listener = listener.display_id(),
            position = self.listeners.len(),
            "Registering listener"
        );
        self.listeners.push(listener);
        self
    }

    /// Listens to every text message matching `pattern`.
    pub fn hear<F, Fut>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, PatternError>
    where
        F: Fn(Response) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoHandlerResult,
    {
        let regex = Regex::new(pattern)?;
        Ok(self.add_listener(Listener::text(regex, into_handler(handler)).id(pattern)))
    }

    /// Listens to text messages addressed to the robot by name or alias.
    ///
    /// A pattern starting with `^` can never match once wrapped; it is
    /// registered anyway and a warning is logged.
    pub fn respond<F, Fut>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, PatternError>
    where
        F: Fn(Response) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoHandlerResult,
    {
        let responder = self.respond_pattern(pattern)?;
        let listener = Listener::text(responder.into_regex(), into_handler(handler)).id(pattern);
        Ok(self.add_listener(listener))
    }

    /// Builds the directed pattern for `pattern`, warning on a leading anchor.
    pub fn respond_pattern(&self, pattern: &str) -> Result<ResponderPattern, PatternError> {
        let responder = ResponderPattern::build(&self.name, self.alias.as_deref(), pattern)?;
        if responder.leading_anchor() {
            warn!(
                parent: &self.span,
                pattern,
                "Anchors don't work well with respond, perhaps you want to use 'hear'"
            );
        }
        Ok(responder)
    }

    /// Listens to users entering the room.
    pub fn enter<F, Fut>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(Response) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoHandlerResult,
    {
        self.add_listener(Listener::enter(into_handler(handler)).id("enter"))
    }

    /// Listens to users leaving the room.
    pub fn leave<F, Fut>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(Response) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoHandlerResult,
    {
        self.add_listener(Listener::leave(into_handler(handler)).id("leave"))
    }

    /// Listens to topic changes.
    pub fn topic<F, Fut>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(Response) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoHandlerResult,
    {
        self.add_listener(Listener::topic(into_handler(handler)).id("topic"))
    }

    /// Listens to messages no other listener matched.
    pub fn catch_all<F, Fut>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(Response) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoHandlerResult,
    {
        self.add_listener(Listener::catch_all(into_handler(handler)).id("catch_all"))
    }

    /// Listens with a custom predicate.
    pub fn listen<P, F, Fut>(&mut self, predicate: P, handler: F) -> &mut Self
    where
        P: Fn(&Message) -> bool + Send + Sync + 'static,
        F: Fn(Response) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoHandlerResult,
    {
        self.add_listener(Listener::predicate(predicate, into_handler(handler)))
    }

    // ------------------------------------------------------------------------
    // Error handlers
    // ------------------------------------------------------------------------

    /// Registers an error handler.
    ///
    /// Handlers run in registration order for every `error` event. A handler
    /// that fails is logged and does not stop the others. A `String` output
    /// is sent to the room of the failed message, when there is one.
    pub fn error<F, Fut>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(Arc<DispatchError>, Option<Response>) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoHandlerResult,
    {
        let handler: ErrorHandler = Arc::new(
            move |error: Arc<DispatchError>,
                  response: Option<Response>|
                  -> BoxFuture<'static, HandlerResult> {
                let fut = handler(error, response.clone());
                Box::pin(deliver(response, fut))
            },
        );
        self.error_handlers.write().push(handler);
        self
    }

    /// Number of registered error handlers.
    pub fn error_handler_count(&self) -> usize {
        self.error_handlers.read().len()
    }

    /// Publishes an error on the `error` event.
    pub async fn emit_error(&self, error: DispatchError, response: Option<Response>) {
        let event = RobotEvent::Error(ErrorEvent {
            error: Arc::new(error),
            response,
        });
        self.events.emit(ERROR, event).await;
    }

    // ------------------------------------------------------------------------
    // Command help
    // ------------------------------------------------------------------------

    /// Adds a command help line.
    pub fn add_help(&mut self, line: impl Into<String>) -> &mut Self {
        self.commands.add(line);
        self
    }

    /// Extracts command help from a plugin's header comment.
    pub fn parse_help(&mut self, source: &str) -> HelpDocumentation {
        let doc = HelpDocumentation::parse(source);
        self.commands.extend(doc.commands().iter().cloned());
        doc
    }

    /// All command help lines, sorted.
    pub fn help_commands(&self) -> Vec<String> {
        self.commands.commands()
    }

    /// The command registry.
    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    // ------------------------------------------------------------------------
    // Plugins
    // ------------------------------------------------------------------------

    /// Loads a plugin: records its help and calls its registration function.
    pub fn load_plugin(
        &mut self,
        plugin: &PluginDescriptor,
        ctx: &PluginLoadContext,
    ) -> Result<(), LoadError> {
        debug!(parent: &self.span, plugin = plugin.name, "Loading plugin");

        if let Some(source) = plugin.help {
            self.parse_help(source);
        }

        let register = plugin.register;
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| register(self, ctx)));
        let outcome = match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => match source.downcast::<PatternError>() {
                Ok(pattern) => Err(LoadError::Pattern {
                    plugin: plugin.name,
                    source: *pattern,
                }),
                Err(source) => Err(LoadError::Failed {
                    plugin: plugin.name,
                    source,
                }),
            },
            Err(panic) => Err(LoadError::Panicked {
                plugin: plugin.name,
                message: panic_message(panic.as_ref()),
            }),
        };

        match &outcome {
            Ok(()) => debug!(parent: &self.span, plugin = plugin.name, "Plugin loaded"),
            Err(e) => error!(parent: &self.span, plugin = plugin.name, error = %e, "Plugin failed to load"),
        }
        outcome
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    /// Dispatches a message to the listeners.
    pub fn receive(&self, message: Message) -> BoxFuture<'_, DispatchOutcome> {
        self.receive_shared(Arc::new(message))
    }

    /// Dispatches an already shared message.
    pub fn receive_shared(&self, message: Arc<Message>) -> BoxFuture<'_, DispatchOutcome> {
        let span = debug_span!(parent: &self.span, "receive", kind = message.kind_name());
        Box::pin(
            async move {
                let matched = self.run_listeners(&message).await;
                let mut outcome = DispatchOutcome {
                    matched,
                    catch_all: false,
                };

                if !matched && !message.is_catch_all() {
                    debug!("No listener matched, dispatching catch-all");
                    self.receive_shared(Message::catch_all(message)).await;
                    outcome.catch_all = true;
                }
                outcome
            }
            .instrument(span),
        )
    }

    async fn run_listeners(&self, message: &Arc<Message>) -> bool {
        let mut matched = false;

        for listener in &self.listeners {
            let call = AssertUnwindSafe(listener.call(message, &self.adapter));
            let failure = match call.catch_unwind().await {
                Ok(Ok(true)) => {
                    matched = true;
                    None
                }
                Ok(Ok(false)) => None,
                Ok(Err(source)) => Some(DispatchError::Listener {
                    listener: listener.display_id().to_string(),
                    source,
                }),
                Err(panic) => Some(DispatchError::Panicked {
                    listener: listener.display_id().to_string(),
                    message: panic_message(panic.as_ref()),
                }),
            };

            if let Some(failure) = failure {
                error!(listener = listener.display_id(), error = %failure, "Listener failed");
                let response = Response::new(
                    Arc::clone(message),
                    Captures::empty(),
                    Arc::clone(&self.adapter),
                );
                self.emit_error(failure, Some(response)).await;
            }

            if message.is_done() {
                debug!(listener = listener.display_id(), "Message done, skipping remaining listeners");
                break;
            }
        }

        matched
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Emits `running` and runs the adapter until it stops.
    pub async fn run(self: Arc<Self>) -> AdapterResult<()> {
        info!(parent: &self.span, adapter = self.adapter.name(), "Robot running");
        self.events.emit(RUNNING, RobotEvent::Running).await;
        let adapter = Arc::clone(&self.adapter);
        adapter.run(self).await
    }

    /// Sends lines through the adapter.
    pub async fn send(&self, envelope: &Envelope, strings: &[String]) -> AdapterResult<()> {
        self.adapter.send(envelope, strings).await
    }

    /// Sends lines to a room.
    pub async fn message_room(&self, room: &str, strings: &[String]) -> AdapterResult<()> {
        self.adapter.send(&Envelope::to_room(room), strings).await
    }

    /// Closes the adapter and the brain.
    ///
    /// In-flight dispatch is not cancelled.
    pub async fn shutdown(&self) {
        info!(parent: &self.span, "Shutting down");
        if let Err(e) = self.adapter.close().await {
            warn!(parent: &self.span, error = %e, "Failed to close adapter");
        }
        if let Err(e) = self.brain.close().await {
            warn!(parent: &self.span, error = %e, "Failed to close brain");
        }
    }
}

impl std::fmt::Debug for Robot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Robot")
            .field("name", &self.name)
            .field("alias", &self.alias)
            .field("listener_count", &self.listeners.len())
            .field("error_handler_count", &self.error_handler_count())
            .field("adapter", &self.adapter.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tracing_test::traced_test;

    use crate::adapter::Adapter;
    use crate::error::BoxError;
    use crate::message::User;

    #[derive(Default)]
    struct RecordingAdapter {
        sent: Mutex<Vec<String>>,
        runs: AtomicUsize,
        closed: AtomicUsize,
    }

    impl RecordingAdapter {
        fn sent(&self) -> Vec<String> {
            self.sent.lock().clone()
        }
    }

    #[async_trait]
    impl Adapter for RecordingAdapter {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send(&self, _envelope: &Envelope, strings: &[String]) -> AdapterResult<()> {
            self.sent.lock().extend_from_slice(strings);
            Ok(())
        }

        async fn run(&self, _robot: Arc<Robot>) -> AdapterResult<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn close(&self) -> AdapterResult<()> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn robot() -> (Robot, Arc<RecordingAdapter>) {
        let adapter = Arc::new(RecordingAdapter::default());
        let robot = Robot::builder("Rubo", Arc::clone(&adapter) as BoxedAdapter)
            .alias("/")
            .build();
        (robot, adapter)
    }

    fn alice() -> User {
        User::new("1", "alice").in_room("general")
    }

    fn text(body: &str) -> Message {
        Message::text(alice(), body)
    }

    fn explode() {
        panic!("kaboom");
    }

    fn record_errors(robot: &mut Robot) -> Arc<Mutex<Vec<String>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        robot.error(move |err: Arc<DispatchError>, _res: Option<Response>| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().push(err.to_string());
            }
        });
        log
    }

    // ------------------------------------------------------------------------
    // Directed and undirected text
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_respond_matches_name_and_alias() {
        let (mut robot, adapter) = robot();
        robot
            .respond("(?i)PING$", |_res: Response| async { "PONG".to_string() })
            .unwrap();

        for body in ["rubo ping", "Rubo: PING", "@rubo ping", "/ping", "/: ping"] {
            let outcome = robot.receive(text(body)).await;
            assert!(outcome.matched, "expected '{body}' to match");
        }
        assert!(!robot.receive(text("hello ping")).await.matched);
        assert!(!robot.receive(text("rubo ping please")).await.matched);

        assert_eq!(adapter.sent(), vec!["PONG"; 5]);
    }

    #[tokio::test]
    async fn test_hear_matches_anywhere_with_captures() {
        let (mut robot, adapter) = robot();
        robot
            .hear(r"(?i)badger(?<plural>s?)", |res: Response| async move {
                let plural = res.named("plural").unwrap_or_default().to_string();
                res.send([format!("badger{plural}?")]).await
            })
            .unwrap();

        robot.receive(text("we don't need no stinking BADGERS")).await;
        robot.receive(text("a badger")).await;

        assert_eq!(adapter.sent(), vec!["badgerS?", "badger?"]);
    }

    #[tokio::test]
    async fn test_reply_prefixes_user_name() {
        let (mut robot, adapter) = robot();
        robot
            .respond("(?i)hi$", |res: Response| async move { res.reply(["hello"]).await })
            .unwrap();

        robot.receive(text("rubo hi")).await;
        assert_eq!(adapter.sent(), vec!["alice: hello"]);
    }

    const ANCHOR_WARNING: &str = "Anchors don't work well with respond";

    #[test]
    #[traced_test]
    fn test_leading_anchor_is_registered_with_warning() {
        let (mut robot, _adapter) = robot();
        robot.respond("^ping", |_res: Response| async {}).unwrap();

        assert_eq!(robot.listener_count(), 1);
        assert!(robot.respond_pattern("^ping").unwrap().leading_anchor());
        assert!(logs_contain(ANCHOR_WARNING));
    }

    #[test]
    #[traced_test]
    fn test_trailing_anchor_does_not_warn() {
        let (mut robot, _adapter) = robot();
        robot.respond("ping$", |_res: Response| async {}).unwrap();

        assert_eq!(robot.listener_count(), 1);
        assert!(!robot.respond_pattern("ping$").unwrap().leading_anchor());
        assert!(!logs_contain(ANCHOR_WARNING));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let (mut robot, _adapter) = robot();
        assert!(robot.hear("(unclosed", |_res: Response| async {}).is_err());
        assert!(robot.respond("[z-a]", |_res: Response| async {}).is_err());
        assert_eq!(robot.listener_count(), 0);
    }

    // ------------------------------------------------------------------------
    // Ordering and done
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_all_matching_listeners_run_in_order() {
        let (mut robot, _adapter) = robot();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            robot
                .hear("hello", move |_res: Response| {
                    let order = Arc::clone(&order);
                    async move { order.lock().push(tag) }
                })
                .unwrap();
        }

        let outcome = robot.receive(text("hello there")).await;
        assert!(outcome.matched);
        assert!(!outcome.catch_all);
        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_finish_skips_remaining_listeners() {
        let (mut robot, _adapter) = robot();
        let counter = Arc::new(AtomicUsize::new(0));

        let first = Arc::clone(&counter);
        robot
            .hear("stop", move |res: Response| {
                let c = Arc::clone(&first);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    res.finish();
                }
            })
            .unwrap();

        let second = Arc::clone(&counter);
        robot
            .hear("stop", move |_res: Response| {
                let c = Arc::clone(&second);
                async move {
                    c.fetch_add(10, Ordering::SeqCst);
                }
            })
            .unwrap();

        robot.receive(text("stop")).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_enter_leave_topic() {
        let (mut robot, adapter) = robot();
        robot.enter(|res: Response| async move { format!("welcome {}", res.user().name) });
        robot.leave(|res: Response| async move { format!("bye {}", res.user().name) });
        robot.topic(|res: Response| async move { res.text().map(|t| format!("topic: {t}")) });

        robot.receive(Message::enter(alice())).await;
        robot.receive(Message::topic(alice(), "rust")).await;
        robot.receive(Message::leave(alice())).await;

        assert_eq!(adapter.sent(), vec!["welcome alice", "topic: rust", "bye alice"]);
    }

    #[tokio::test]
    async fn test_listen_with_predicate() {
        let (mut robot, adapter) = robot();
        robot.listen(
            |message: &Message| message.room() == Some("general"),
            |_res: Response| async { "seen".to_string() },
        );

        robot.receive(text("anything")).await;
        robot
            .receive(Message::text(User::new("2", "bob").in_room("random"), "anything"))
            .await;

        assert_eq!(adapter.sent(), vec!["seen"]);
    }

    // ------------------------------------------------------------------------
    // Catch-all
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_catch_all_fires_only_when_unmatched() {
        let (mut robot, _adapter) = robot();
        let counter = Arc::new(AtomicUsize::new(0));

        robot.hear("known", |_res: Response| async {}).unwrap();
        let c = Arc::clone(&counter);
        robot.catch_all(move |_res: Response| {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        let outcome = robot.receive(text("known")).await;
        assert_eq!(outcome, DispatchOutcome { matched: true, catch_all: false });
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        let outcome = robot.receive(text("something else")).await;
        assert_eq!(outcome, DispatchOutcome { matched: false, catch_all: true });
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_catch_all_sees_original_message() {
        let (mut robot, adapter) = robot();
        robot.catch_all(|res: Response| async move {
            assert!(!res.message().is_catch_all());
            res.reply([format!("what is '{}'?", res.text().unwrap_or_default())]).await
        });

        robot.receive(text("gibberish")).await;
        assert_eq!(adapter.sent(), vec!["alice: what is 'gibberish'?"]);
    }

    #[tokio::test]
    async fn test_unmatched_catch_all_is_not_rewrapped() {
        let (robot, _adapter) = robot();
        let wrapper = Message::catch_all(Arc::new(text("nothing")));

        let outcome = robot.receive_shared(wrapper).await;
        assert_eq!(outcome, DispatchOutcome::default());
    }

    #[tokio::test]
    async fn test_catch_all_finish_stops_later_catch_alls() {
        let (mut robot, adapter) = robot();
        robot.catch_all(|res: Response| async move {
            res.finish();
            "first".to_string()
        });
        robot.catch_all(|_res: Response| async { "second".to_string() });

        robot.receive(text("???")).await;
        assert_eq!(adapter.sent(), vec!["first"]);
    }

    // ------------------------------------------------------------------------
    // Errors
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_handler_error_emits_one_error_and_continues() {
        let (mut robot, adapter) = robot();
        let errors = record_errors(&mut robot);

        robot
            .hear("boom", |_res: Response| async { Err::<(), _>("boom failed") })
            .unwrap();
        robot
            .hear("boom", |_res: Response| async { "still here".to_string() })
            .unwrap();

        let outcome = robot.receive(text("boom")).await;

        assert!(outcome.matched);
        assert_eq!(adapter.sent(), vec!["still here"]);
        assert_eq!(*errors.lock(), vec!["listener 'boom' failed: boom failed"]);
    }

    #[tokio::test]
    async fn test_failing_listener_alone_falls_through_to_catch_all() {
        let (mut robot, adapter) = robot();
        let errors = record_errors(&mut robot);

        robot
            .hear("boom", |_res: Response| async { Err::<(), _>("nope") })
            .unwrap();
        robot.catch_all(|_res: Response| async { "fallback".to_string() });

        let outcome = robot.receive(text("boom")).await;

        assert!(!outcome.matched);
        assert!(outcome.catch_all);
        assert_eq!(errors.lock().len(), 1);
        assert_eq!(adapter.sent(), vec!["fallback"]);
    }

    #[tokio::test]
    async fn test_panicking_listener_is_isolated() {
        let (mut robot, adapter) = robot();
        let errors = record_errors(&mut robot);

        robot
            .hear("panic", |_res: Response| async { explode() })
            .unwrap();
        robot
            .hear("panic", |_res: Response| async { "survived".to_string() })
            .unwrap();

        robot.receive(text("panic")).await;

        assert_eq!(adapter.sent(), vec!["survived"]);
        assert_eq!(*errors.lock(), vec!["listener 'panic' panicked: kaboom"]);
    }

    #[tokio::test]
    async fn test_error_handlers_are_isolated() {
        let (mut robot, _adapter) = robot();
        let counter = Arc::new(AtomicUsize::new(0));

        robot.error(|_err: Arc<DispatchError>, _res: Option<Response>| async {
            Err::<(), BoxError>("handler failed".into())
        });
        robot.error(|_err: Arc<DispatchError>, _res: Option<Response>| async { explode() });
        let c = Arc::clone(&counter);
        robot.error(move |_err: Arc<DispatchError>, _res: Option<Response>| {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        robot
            .hear("boom", |_res: Response| async { Err::<(), _>("boom") })
            .unwrap();
        robot.receive(text("boom")).await;

        assert_eq!(robot.error_handler_count(), 3);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_error_handler_can_answer_the_room() {
        let (mut robot, adapter) = robot();
        robot.error(|err: Arc<DispatchError>, _res: Option<Response>| async move {
            format!("oops: {err}")
        });
        robot
            .hear("boom", |_res: Response| async { Err::<(), _>("bad") })
            .unwrap();

        robot.receive(text("boom")).await;
        assert_eq!(adapter.sent(), vec!["oops: listener 'boom' failed: bad"]);
    }

    #[tokio::test]
    async fn test_emit_error_without_response() {
        let (mut robot, adapter) = robot();
        let errors = record_errors(&mut robot);

        robot
            .emit_error(DispatchError::other("disk full"), None)
            .await;

        assert_eq!(*errors.lock(), vec!["disk full"]);
        assert!(adapter.sent().is_empty());
    }

    // ------------------------------------------------------------------------
    // Help and plugins
    // ------------------------------------------------------------------------

    fn register_ping(robot: &mut Robot, _ctx: &PluginLoadContext) -> Result<(), BoxError> {
        robot.respond("(?i)ping$", |_res: Response| async { "PONG".to_string() })?;
        Ok(())
    }

    fn register_failing(_robot: &mut Robot, _ctx: &PluginLoadContext) -> Result<(), BoxError> {
        Err("missing token".into())
    }

    fn register_panicking(_robot: &mut Robot, _ctx: &PluginLoadContext) -> Result<(), BoxError> {
        explode();
        Ok(())
    }

    fn register_bad_pattern(robot: &mut Robot, _ctx: &PluginLoadContext) -> Result<(), BoxError> {
        robot.hear("(", |_res: Response| async {})?;
        Ok(())
    }

    #[tokio::test]
    async fn test_load_plugin_registers_listeners_and_help() {
        let (mut robot, adapter) = robot();
        robot.add_help("rubo zebra - last");
        let plugin = crate::define_plugin! {
            name: "ping",
            register: register_ping,
            help: "//! Commands:\n//!   rubo ping - Reply with PONG\n//!   rubo echo <text> - Echo\n\nfn main() {}\n",
        };

        robot.load_plugin(&plugin, &PluginLoadContext::default()).unwrap();
        robot.receive(text("rubo ping")).await;

        assert_eq!(adapter.sent(), vec!["PONG"]);
        assert_eq!(
            robot.help_commands(),
            vec!["rubo echo <text> - Echo", "rubo ping - Reply with PONG", "rubo zebra - last"]
        );
    }

    #[test]
    fn test_load_plugin_failures() {
        let (mut robot, _adapter) = robot();
        let ctx = PluginLoadContext::default();

        let failing = crate::define_plugin! { name: "failing", register: register_failing };
        let err = robot.load_plugin(&failing, &ctx).unwrap_err();
        assert!(matches!(err, LoadError::Failed { plugin: "failing", .. }));

        let panicking = crate::define_plugin! { name: "panicking", register: register_panicking };
        let err = robot.load_plugin(&panicking, &ctx).unwrap_err();
        assert!(matches!(err, LoadError::Panicked { plugin: "panicking", ref message } if message == "kaboom"));

        let bad = crate::define_plugin! { name: "bad", register: register_bad_pattern };
        let err = robot.load_plugin(&bad, &ctx).unwrap_err();
        assert!(matches!(err, LoadError::Pattern { plugin: "bad", .. }));
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_run_emits_running_and_drives_adapter() {
        let (robot, adapter) = robot();
        let running = Arc::new(AtomicUsize::new(0));
        let r = Arc::clone(&running);
        robot.events().on(RUNNING, move |_| {
            let r = Arc::clone(&r);
            Box::pin(async move {
                r.fetch_add(1, Ordering::SeqCst);
            })
        });

        let robot = Arc::new(robot);
        Arc::clone(&robot).run().await.unwrap();
        robot.shutdown().await;

        assert_eq!(running.load(Ordering::SeqCst), 1);
        assert_eq!(adapter.runs.load(Ordering::SeqCst), 1);
        assert_eq!(adapter.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_message_room() {
        let (robot, adapter) = robot();
        robot
            .message_room("general", &["announcement".to_string()])
            .await
            .unwrap();
        assert_eq!(adapter.sent(), vec!["announcement"]);
    }
}
