//! Error types for the Rubo core engine.
//!
//! Listener and error-handler failures are values of [`BoxError`]; the
//! dispatcher turns them into [`DispatchError`]s and publishes them on the
//! robot's `error` event instead of propagating them.

use thiserror::Error;

/// Boxed error returned by user handlers and plugin registration functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type returned by listener and error handlers.
pub type HandlerResult = Result<(), BoxError>;

// =============================================================================
// Pattern Errors
// =============================================================================

/// Errors raised while building a listener pattern.
#[derive(Debug, Clone, Error)]
pub enum PatternError {
    /// The pattern failed to compile.
    #[error("invalid pattern: {0}")]
    Invalid(#[from] regex::Error),
}

// =============================================================================
// Dispatch Errors
// =============================================================================

/// A failure captured while dispatching a message.
///
/// This is the payload of the robot's `error` event.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A listener handler returned an error.
    #[error("listener '{listener}' failed: {source}")]
    Listener {
        /// Listener id, or `"unnamed"`.
        listener: String,
        /// The handler's error.
        #[source]
        source: BoxError,
    },

    /// A listener matcher or handler panicked.
    #[error("listener '{listener}' panicked: {message}")]
    Panicked {
        /// Listener id, or `"unnamed"`.
        listener: String,
        /// Panic payload rendered as text.
        message: String,
    },

    /// An error published explicitly through `Robot::emit_error`.
    #[error("{0}")]
    Other(BoxError),
}

impl DispatchError {
    /// Wraps an arbitrary error for explicit publication.
    pub fn other(err: impl Into<BoxError>) -> Self {
        Self::Other(err.into())
    }
}

// =============================================================================
// Load Errors
// =============================================================================

/// A plugin failed during its one-time registration call.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The registration function returned an error.
    #[error("plugin '{plugin}' failed to load: {source}")]
    Failed {
        /// Plugin name.
        plugin: &'static str,
        /// The registration error.
        #[source]
        source: BoxError,
    },

    /// The registration function panicked.
    #[error("plugin '{plugin}' panicked while loading: {message}")]
    Panicked {
        /// Plugin name.
        plugin: &'static str,
        /// Panic payload rendered as text.
        message: String,
    },

    /// A listener pattern declared by the plugin did not compile.
    #[error("plugin '{plugin}' registered an invalid pattern: {source}")]
    Pattern {
        /// Plugin name.
        plugin: &'static str,
        /// The pattern error.
        #[source]
        source: PatternError,
    },
}

// =============================================================================
// Collaborator Errors
// =============================================================================

/// Errors reported by transport adapters.
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    /// Sending a message failed.
    #[error("failed to send message: {0}")]
    SendFailed(String),

    /// The adapter is not connected.
    #[error("adapter is not connected")]
    NotConnected,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),

    /// Other adapter error.
    #[error("adapter error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for AdapterError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Errors reported by brain implementations.
#[derive(Debug, Clone, Error)]
pub enum BrainError {
    /// The brain has already been closed.
    #[error("brain is closed")]
    Closed,

    /// Backend failure.
    #[error("brain error: {0}")]
    Backend(String),
}

/// Result type for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Result type for brain operations.
pub type BrainResult<T> = Result<T, BrainError>;

/// Renders a panic payload caught by `catch_unwind`.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
