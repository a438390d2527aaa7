//! Named-event publish/subscribe.
//!
//! [`EventEmitter`] carries the robot's lifecycle signals (`connected`,
//! `running`, `error`). Handlers are async and run sequentially in
//! registration order.
//!
//! ```rust,ignore
//! let emitter = EventEmitter::<u32>::new();
//! emitter.on("tick", |n| Box::pin(async move { println!("tick {n}") }));
//! emitter.emit("tick", 1).await;
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tracing::trace;

/// A type-erased event handler.
pub type EventHandler<A> = Arc<dyn Fn(A) -> BoxFuture<'static, ()> + Send + Sync>;

struct Subscription<A> {
    id: u64,
    once: bool,
    handler: EventHandler<A>,
}

impl<A> Clone for Subscription<A> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            once: self.once,
            handler: Arc::clone(&self.handler),
        }
    }
}

/// A named-event emitter with snapshot semantics.
///
/// The set of handlers invoked by [`emit`](Self::emit) is captured when the
/// call starts; the internal lock is released before any handler runs, so
/// handlers may register new handlers or emit again.
///
/// The emitter does not isolate failures. A handler that needs isolation must
/// catch inside itself.
pub struct EventEmitter<A> {
    subscriptions: Mutex<HashMap<String, Vec<Subscription<A>>>>,
    next_id: AtomicU64,
}

impl<A> Default for EventEmitter<A> {
    fn default() -> Self {
        Self {
            subscriptions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }
}

impl<A: Clone + Send + 'static> EventEmitter<A> {
    /// Creates an emitter with no handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a persistent handler for `event`.
    pub fn on<F>(&self, event: impl Into<String>, handler: F)
    where
        F: Fn(A) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        self.subscribe(event.into(), false, Arc::new(handler));
    }

    /// Registers a handler that is removed right before its first invocation.
    pub fn once<F>(&self, event: impl Into<String>, handler: F)
    where
        F: Fn(A) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        self.subscribe(event.into(), true, Arc::new(handler));
    }

    fn subscribe(&self, event: String, once: bool, handler: EventHandler<A>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscriptions
            .lock()
            .entry(event)
            .or_default()
            .push(Subscription { id, once, handler });
    }

    /// Invokes every handler registered for `event`, in registration order.
    ///
    /// Returns the number of handlers invoked.
    pub async fn emit(&self, event: &str, args: A) -> usize {
        let snapshot = {
            let mut subscriptions = self.subscriptions.lock();
            let Some(list) = subscriptions.get_mut(event) else {
                return 0;
            };
            let snapshot = list.clone();
            list.retain(|s| !s.once);
            snapshot
        };

        trace!(event, handlers = snapshot.len(), "Emitting event");

        for subscription in &snapshot {
            trace!(event, subscription = subscription.id, "Invoking handler");
            (subscription.handler)(args.clone()).await;
        }
        snapshot.len()
    }

    /// Returns the number of handlers currently registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.subscriptions.lock().get(event).map_or(0, Vec::len)
    }

    /// Removes every handler registered for `event`.
    pub fn remove_all(&self, event: &str) {
        self.subscriptions.lock().remove(event);
    }
}

impl<A> std::fmt::Debug for EventEmitter<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let subscriptions = self.subscriptions.lock();
        let mut events: Vec<_> = subscriptions.keys().cloned().collect();
        events.sort();
        f.debug_struct("EventEmitter")
            .field("events", &events)
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish()
    }
}
