//! Listeners: a matcher paired with an async handler.
//!
//! The dispatcher only ever calls [`Listener::call`]. A listener whose
//! matcher returns `Some(captures)` builds a [`Response`] and awaits its
//! handler.
//!
//! # Handlers
//!
//! Any `Fn(Response) -> impl Future` is a handler as long as the future's
//! output implements [`IntoHandlerResult`]:
//!
//! ```rust,ignore
//! // Nothing to report
//! robot.hear("hello", |res: Response| async move {
//!     let _ = res.send(["hi"]).await;
//! })?;
//!
//! // Errors become `error` events
//! robot.hear("fail", |_res: Response| async move {
//!     Err::<(), _>("boom")
//! })?;
//!
//! // A returned String is sent to the room
//! robot.respond("(?i)ping$", |_res: Response| async move { "PONG".to_string() })?;
//! ```

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use regex::Regex;
use tracing::{debug, trace};

use crate::adapter::BoxedAdapter;
use crate::error::{BoxError, HandlerResult};
use crate::message::{Message, MessageKind};
use crate::pattern::Captures;
use crate::response::Response;

// ============================================================================
// Handler results
// ============================================================================

/// What a handler hands back once its future completes.
#[derive(Debug)]
pub enum HandlerOutput {
    /// Nothing to do.
    Done,
    /// Send this text to the message's room.
    Send(String),
}

/// Conversion from handler return values into a dispatch result.
pub trait IntoHandlerResult: Send {
    /// Converts the value.
    fn into_handler_result(self) -> Result<HandlerOutput, BoxError>;
}

impl IntoHandlerResult for () {
    fn into_handler_result(self) -> Result<HandlerOutput, BoxError> {
        Ok(HandlerOutput::Done)
    }
}

impl IntoHandlerResult for String {
    fn into_handler_result(self) -> Result<HandlerOutput, BoxError> {
        Ok(HandlerOutput::Send(self))
    }
}

impl IntoHandlerResult for Option<String> {
    fn into_handler_result(self) -> Result<HandlerOutput, BoxError> {
        Ok(self.map_or(HandlerOutput::Done, HandlerOutput::Send))
    }
}

impl<T, E> IntoHandlerResult for Result<T, E>
where
    T: IntoHandlerResult,
    E: Into<BoxError> + Send,
{
    fn into_handler_result(self) -> Result<HandlerOutput, BoxError> {
        self.map_err(Into::<BoxError>::into)?.into_handler_result()
    }
}

// ============================================================================
// Handler and Matcher types
// ============================================================================

/// A type-erased listener handler.
pub type BoxedHandler = Arc<dyn Fn(Response) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// A type-erased matcher. `Some` means the listener fires with these captures.
pub type MatchFn = Arc<dyn Fn(&Message) -> Option<Captures> + Send + Sync>;

/// Converts a handler function into a [`BoxedHandler`].
///
/// A `String` output is sent back through the response before the handler
/// result is reported.
pub fn into_handler<F, Fut>(f: F) -> BoxedHandler
where
    F: Fn(Response) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: IntoHandlerResult,
{
    Arc::new(move |res: Response| -> BoxFuture<'static, HandlerResult> {
        let fut = f(res.clone());
        Box::pin(deliver(Some(res), fut))
    })
}

/// Awaits a handler future and acts on its output.
pub(crate) async fn deliver<Fut>(response: Option<Response>, fut: Fut) -> HandlerResult
where
    Fut: Future + Send,
    Fut::Output: IntoHandlerResult,
{
    match fut.await.into_handler_result()? {
        HandlerOutput::Done => Ok(()),
        HandlerOutput::Send(text) => match response {
            Some(res) => Ok(res.send([text]).await?),
            None => Ok(()),
        },
    }
}

// ============================================================================
// Listener
// ============================================================================

/// A matcher and handler registered on the robot.
#[derive(Clone)]
pub struct Listener {
    id: Option<String>,
    matcher: MatchFn,
    handler: BoxedHandler,
}

impl Listener {
    /// Creates a listener from a raw matcher.
    pub fn new<M>(matcher: M, handler: BoxedHandler) -> Self
    where
        M: Fn(&Message) -> Option<Captures> + Send + Sync + 'static,
    {
        Self {
            id: None,
            matcher: Arc::new(matcher),
            handler,
        }
    }

    /// Creates a listener from a boolean predicate; captures stay empty.
    pub fn predicate<P>(predicate: P, handler: BoxedHandler) -> Self
    where
        P: Fn(&Message) -> bool + Send + Sync + 'static,
    {
        Self::new(
            move |message| predicate(message).then(Captures::empty),
            handler,
        )
    }

    /// Matches text messages against `regex`.
    pub fn text(regex: Regex, handler: BoxedHandler) -> Self {
        Self::new(
            move |message| match message.kind() {
                MessageKind::Text { text, .. } => Captures::from_match(&regex, text),
                _ => None,
            },
            handler,
        )
    }

    /// Matches enter messages.
    pub fn enter(handler: BoxedHandler) -> Self {
        Self::predicate(|m| matches!(m.kind(), MessageKind::Enter), handler)
    }

    /// Matches leave messages.
    pub fn leave(handler: BoxedHandler) -> Self {
        Self::predicate(|m| matches!(m.kind(), MessageKind::Leave), handler)
    }

    /// Matches topic changes.
    pub fn topic(handler: BoxedHandler) -> Self {
        Self::predicate(|m| matches!(m.kind(), MessageKind::Topic { .. }), handler)
    }

    /// Matches catch-all wrappers.
    ///
    /// The handler sees the wrapped original message; `finish` marks both
    /// the original and the wrapper as done.
    pub fn catch_all(handler: BoxedHandler) -> Self {
        let unwrap: BoxedHandler = Arc::new(move |res: Response| -> BoxFuture<'static, HandlerResult> {
            handler(res.unwrap_catch_all())
        });
        Self::predicate(Message::is_catch_all, unwrap)
    }

    /// Names this listener for logs and error reports.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// The listener id, if set.
    pub fn get_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The listener id or `"unnamed"`.
    pub fn display_id(&self) -> &str {
        self.id.as_deref().unwrap_or("unnamed")
    }

    /// Evaluates the matcher and, on a match, awaits the handler.
    ///
    /// Returns `Ok(false)` without side effects when the matcher rejects the
    /// message. Failures are not isolated here.
    pub async fn call(&self, message: &Arc<Message>, adapter: &BoxedAdapter) -> Result<bool, BoxError> {
        let Some(captures) = (self.matcher)(message) else {
            trace!(listener = self.display_id(), "Listener did not match");
            return Ok(false);
        };

        debug!(listener = self.display_id(), kind = message.kind_name(), "Listener matched");
        let response = Response::new(Arc::clone(message), captures, Arc::clone(adapter));
        (self.handler)(response).await?;
        Ok(true)
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener").field("id", &self.id).finish()
    }
}
