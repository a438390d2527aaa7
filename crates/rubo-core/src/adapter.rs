//! Collaborator contracts: transport adapters and the brain.
//!
//! The engine only needs a small surface from each:
//!
//! - [`Adapter`]: `send`/`reply`/`emote` for responses, `run` to feed inbound
//!   messages into [`Robot::receive`](crate::Robot::receive), `close` on shutdown.
//! - [`Brain`]: a key/value store whose `close` is called on shutdown.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use crate::error::{AdapterResult, BrainError, BrainResult};
use crate::message::{Message, User};
use crate::robot::Robot;

/// Addressing information for an outgoing message.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// The user the outgoing message concerns.
    pub user: User,
    /// Target room; falls back to the user's room.
    pub room: Option<String>,
    /// The inbound message being answered, if any.
    pub message: Option<Arc<Message>>,
}

impl Envelope {
    /// Builds an envelope answering `message`.
    pub fn for_message(message: Arc<Message>) -> Self {
        let user = message.user().clone();
        Self {
            room: user.room.clone(),
            user,
            message: Some(message),
        }
    }

    /// Builds an envelope addressed to a room.
    pub fn to_room(room: impl Into<String>) -> Self {
        let room = room.into();
        Self {
            user: User::new("", "").in_room(room.clone()),
            room: Some(room),
            message: None,
        }
    }
}

/// A transport adapter bridging a chat network and the robot.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Adapter name, for logs.
    fn name(&self) -> &str;

    /// Sends one or more lines to the envelope's room or user.
    async fn send(&self, envelope: &Envelope, strings: &[String]) -> AdapterResult<()>;

    /// Replies to the envelope's user.
    ///
    /// The default prefixes each line with `"<user name>: "` and sends it.
    async fn reply(&self, envelope: &Envelope, strings: &[String]) -> AdapterResult<()> {
        let prefixed: Vec<String> = strings
            .iter()
            .map(|s| format!("{}: {s}", envelope.user.name))
            .collect();
        self.send(envelope, &prefixed).await
    }

    /// Sends an emote ("/me" style) message. Defaults to a plain send.
    async fn emote(&self, envelope: &Envelope, strings: &[String]) -> AdapterResult<()> {
        self.send(envelope, strings).await
    }

    /// Runs the adapter's event loop until the transport ends.
    ///
    /// Implementations emit `connected` on the robot's event emitter once a
    /// session is established and then await `robot.receive` for every
    /// inbound message, one at a time.
    async fn run(&self, robot: Arc<Robot>) -> AdapterResult<()>;

    /// Closes the transport.
    async fn close(&self) -> AdapterResult<()>;
}

/// Boxed adapter handle.
pub type BoxedAdapter = Arc<dyn Adapter>;

/// The robot's key/value memory.
#[async_trait]
pub trait Brain: Send + Sync {
    /// Reads a key.
    async fn get(&self, key: &str) -> BrainResult<Option<Value>>;

    /// Writes a key.
    async fn set(&self, key: &str, value: Value) -> BrainResult<()>;

    /// Removes a key, returning the old value.
    async fn remove(&self, key: &str) -> BrainResult<Option<Value>>;

    /// Flushes and closes the store.
    async fn close(&self) -> BrainResult<()>;
}

/// Boxed brain handle.
pub type BoxedBrain = Arc<dyn Brain>;

/// In-process brain. Data lives as long as the process.
#[derive(Debug, Default)]
pub struct MemoryBrain {
    data: RwLock<HashMap<String, Value>>,
    closed: AtomicBool,
}

impl MemoryBrain {
    /// Creates an empty brain.
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self) -> BrainResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(BrainError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Brain for MemoryBrain {
    async fn get(&self, key: &str) -> BrainResult<Option<Value>> {
        self.ensure_open()?;
        Ok(self.data.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> BrainResult<()> {
        self.ensure_open()?;
        self.data.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> BrainResult<Option<Value>> {
        self.ensure_open()?;
        Ok(self.data.write().remove(key))
    }

    async fn close(&self) -> BrainResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
