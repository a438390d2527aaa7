//! The handler-facing view of one dispatch attempt.

use std::sync::Arc;

use crate::adapter::{BoxedAdapter, Envelope};
use crate::error::AdapterResult;
use crate::message::{Message, User};
use crate::pattern::Captures;

/// Wraps the inbound message, its captures and the adapter used to answer it.
///
/// A new `Response` is built for every listener invocation.
#[derive(Clone)]
pub struct Response {
    message: Arc<Message>,
    captures: Captures,
    adapter: BoxedAdapter,
    wrapper: Option<Arc<Message>>,
}

impl Response {
    /// Creates a response for `message`.
    pub fn new(message: Arc<Message>, captures: Captures, adapter: BoxedAdapter) -> Self {
        Self {
            message,
            captures,
            adapter,
            wrapper: None,
        }
    }

    /// Exposes the original message of a catch-all wrapper to the handler.
    pub(crate) fn unwrap_catch_all(mut self) -> Self {
        if let Some(original) = self.message.original().cloned() {
            self.wrapper = Some(std::mem::replace(&mut self.message, original));
        }
        self
    }

    /// The message being handled.
    pub fn message(&self) -> &Arc<Message> {
        &self.message
    }

    /// The sending user.
    pub fn user(&self) -> &User {
        self.message.user()
    }

    /// The message text, if the message carries text.
    pub fn text(&self) -> Option<&str> {
        self.message.text_content()
    }

    /// All capture groups.
    pub fn captures(&self) -> &Captures {
        &self.captures
    }

    /// Capture group `index`; 0 is the whole match.
    pub fn group(&self, index: usize) -> Option<&str> {
        self.captures.get(index)
    }

    /// Named capture group.
    pub fn named(&self, name: &str) -> Option<&str> {
        self.captures.name(name)
    }

    /// The envelope used for outgoing messages.
    pub fn envelope(&self) -> Envelope {
        Envelope::for_message(Arc::clone(&self.message))
    }

    /// Sends lines to the room the message came from.
    pub async fn send<I, S>(&self, strings: I) -> AdapterResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let strings: Vec<String> = strings.into_iter().map(Into::into).collect();
        self.adapter.send(&self.envelope(), &strings).await
    }

    /// Replies to the sending user.
    pub async fn reply<I, S>(&self, strings: I) -> AdapterResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let strings: Vec<String> = strings.into_iter().map(Into::into).collect();
        self.adapter.reply(&self.envelope(), &strings).await
    }

    /// Sends an emote to the room.
    pub async fn emote<I, S>(&self, strings: I) -> AdapterResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let strings: Vec<String> = strings.into_iter().map(Into::into).collect();
        self.adapter.emote(&self.envelope(), &strings).await
    }

    /// Marks the message as done; later listeners in this pass are skipped.
    pub fn finish(&self) {
        self.message.finish();
        if let Some(wrapper) = &self.wrapper {
            wrapper.finish();
        }
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("message", &self.message)
            .field("captures", &self.captures)
            .field("adapter", &self.adapter.name())
            .finish()
    }
}
