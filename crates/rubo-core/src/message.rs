//! Inbound message model.
//!
//! Every event the adapter hands to the robot is a [`Message`]: the
//! originating [`User`], a `done` flag and a [`MessageKind`] describing what
//! happened.
//!
//! ```text
//! Message { user, done, kind }
//! └── MessageKind
//!     ├── Text { id, text }
//!     ├── Enter
//!     ├── Leave
//!     ├── Topic { text }
//!     └── CatchAll(Arc<Message>)   ← wraps an unmatched original
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

/// The user (and room) a message came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Transport-specific user identifier.
    pub id: String,
    /// Display name, used as the reply prefix.
    pub name: String,
    /// Room the user spoke in, if any.
    #[serde(default)]
    pub room: Option<String>,
}

impl User {
    /// Creates a user with no room.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            room: None,
        }
    }

    /// Sets the room.
    pub fn in_room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }
}

/// What kind of event a [`Message`] represents.
#[derive(Debug, Clone)]
pub enum MessageKind {
    /// A plain text message.
    Text {
        /// Transport message id, if the transport has one.
        id: Option<String>,
        /// The message text.
        text: String,
    },
    /// The user entered the room.
    Enter,
    /// The user left the room.
    Leave,
    /// The room topic changed.
    Topic {
        /// The new topic.
        text: String,
    },
    /// An original message that no listener matched.
    CatchAll(Arc<Message>),
}

/// A single inbound event.
///
/// `done` can be set by any handler holding a reference; it stops the
/// remaining listeners of the current dispatch pass.
pub struct Message {
    user: User,
    kind: MessageKind,
    done: AtomicBool,
}

impl Message {
    /// Creates a message of the given kind.
    pub fn new(user: User, kind: MessageKind) -> Self {
        Self {
            user,
            kind,
            done: AtomicBool::new(false),
        }
    }

    /// Creates a text message.
    pub fn text(user: User, text: impl Into<String>) -> Self {
        Self::new(
            user,
            MessageKind::Text {
                id: None,
                text: text.into(),
            },
        )
    }

    /// Creates a text message carrying a transport id.
    pub fn text_with_id(user: User, text: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(
            user,
            MessageKind::Text {
                id: Some(id.into()),
                text: text.into(),
            },
        )
    }

    /// Creates an enter message.
    pub fn enter(user: User) -> Self {
        Self::new(user, MessageKind::Enter)
    }

    /// Creates a leave message.
    pub fn leave(user: User) -> Self {
        Self::new(user, MessageKind::Leave)
    }

    /// Creates a topic-change message.
    pub fn topic(user: User, text: impl Into<String>) -> Self {
        Self::new(user, MessageKind::Topic { text: text.into() })
    }

    /// Wraps an unmatched message for the catch-all pass.
    ///
    /// A message that is already a catch-all is returned unchanged.
    pub fn catch_all(original: Arc<Message>) -> Arc<Message> {
        if original.is_catch_all() {
            return original;
        }
        let user = original.user.clone();
        Arc::new(Self::new(user, MessageKind::CatchAll(original)))
    }

    /// Returns the originating user.
    pub fn user(&self) -> &User {
        &self.user
    }

    /// Returns the room, if any.
    pub fn room(&self) -> Option<&str> {
        self.user.room.as_deref()
    }

    /// Returns the message kind.
    pub fn kind(&self) -> &MessageKind {
        &self.kind
    }

    /// Returns the text for text and topic messages.
    pub fn text_content(&self) -> Option<&str> {
        match &self.kind {
            MessageKind::Text { text, .. } | MessageKind::Topic { text } => Some(text),
            MessageKind::Enter | MessageKind::Leave | MessageKind::CatchAll(_) => None,
        }
    }

    /// Returns the wrapped original for a catch-all.
    pub fn original(&self) -> Option<&Arc<Message>> {
        match &self.kind {
            MessageKind::CatchAll(original) => Some(original),
            _ => None,
        }
    }

    /// Whether this message is a catch-all wrapper.
    pub fn is_catch_all(&self) -> bool {
        matches!(self.kind, MessageKind::CatchAll(_))
    }

    /// Stops processing of further listeners for this dispatch pass.
    pub fn finish(&self) {
        self.done.store(true, Ordering::SeqCst);
    }

    /// Whether a handler has finished this message.
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    /// Short name of the message kind, for logs.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            MessageKind::Text { .. } => "text",
            MessageKind::Enter => "enter",
            MessageKind::Leave => "leave",
            MessageKind::Topic { .. } => "topic",
            MessageKind::CatchAll(_) => "catch_all",
        }
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("user", &self.user)
            .field("kind", &self.kind)
            .field("done", &self.is_done())
            .finish()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            MessageKind::Text { text, .. } => f.write_str(text),
            MessageKind::Topic { text } => write!(f, "topic: {text}"),
            MessageKind::Enter => write!(f, "{} entered", self.user.name),
            MessageKind::Leave => write!(f, "{} left", self.user.name),
            MessageKind::CatchAll(original) => write!(f, "{original}"),
        }
    }
}
