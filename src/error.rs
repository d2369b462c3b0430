//! Configuration errors and the handler they are reported through.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// A violated configuration invariant.
///
/// These are programmer mistakes rather than runtime conditions. They are
/// reported through an [`ErrorHandler`] and the offending operation becomes a
/// no-op, so the rest of the loop keeps running.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoopError {
    #[error("more than one effect handler is handling the effect: {effect} - {handlers:?}")]
    AmbiguousEffect {
        effect: String,
        handlers: Vec<&'static str>,
    },

    #[error("no effect handler is handling the effect: {effect}")]
    UnhandledEffect { effect: String },

    #[error("effect handler only supports connecting one loop")]
    AlreadyConnected,

    #[error("cannot accept events after the loop has been disposed: {event}")]
    DispatchAfterDispose { event: String },

    #[error("cannot add an observer to a disposed loop")]
    ObserveAfterDispose,

    #[error("cannot initialize the event processor twice")]
    AlreadyInitialized,
}

/// Receives every [`LoopError`] detected by the runtime.
///
/// The handler is passed explicitly to the components that can detect
/// configuration errors (see [`Builder::with_error_handler`](crate::Builder::with_error_handler)
/// and [`EffectHandlerConnectable::new`](crate::EffectHandlerConnectable::new)).
/// The default, [`ErrorHandler::aborting`], logs the error and aborts the process.
///
/// # Example
///
/// ```rust
/// use mobius_loop::{ErrorHandler, LoopError};
///
/// let handler = ErrorHandler::new(|error: &LoopError| eprintln!("mobius: {error}"));
/// handler.report(LoopError::AlreadyConnected);
/// ```
#[derive(Clone)]
pub struct ErrorHandler(Arc<dyn Fn(&LoopError) + Send + Sync>);

impl ErrorHandler {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&LoopError) + Send + Sync + 'static,
    {
        Self(Arc::new(handler))
    }

    /// Logs the error and terminates the process.
    pub fn aborting() -> Self {
        Self::new(|error| {
            tracing::error!(%error, "mobius loop configuration error");
            std::process::abort();
        })
    }

    pub fn report(&self, error: LoopError) {
        (self.0)(&error);
    }
}

impl Default for ErrorHandler {
    fn default() -> Self {
        Self::aborting()
    }
}

impl fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ErrorHandler")
    }
}

#[cfg(any(test, feature = "testing"))]
/// Error handler that records reported errors instead of aborting.
///
/// Only available with the `testing` feature.
///
/// # Example
///
/// ```rust
/// use mobius_loop::{ErrorRecorder, LoopError};
///
/// let recorder = ErrorRecorder::new();
/// recorder.handler().report(LoopError::AlreadyConnected);
///
/// assert_eq!(recorder.errors(), vec![LoopError::AlreadyConnected]);
/// ```
#[derive(Clone)]
pub struct ErrorRecorder {
    errors: Arc<spin::Mutex<Vec<LoopError>>>,
}

#[cfg(any(test, feature = "testing"))]
impl ErrorRecorder {
    pub fn new() -> Self {
        Self {
            errors: Arc::new(spin::Mutex::new(Vec::new())),
        }
    }

    /// An [`ErrorHandler`] that appends to this recorder.
    pub fn handler(&self) -> ErrorHandler {
        let errors = Arc::clone(&self.errors);
        ErrorHandler::new(move |error| errors.lock().push(error.clone()))
    }

    pub fn errors(&self) -> Vec<LoopError> {
        self.errors.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.errors.lock().len()
    }

    pub fn clear(&self) {
        self.errors.lock().clear();
    }
}

#[cfg(any(test, feature = "testing"))]
impl Default for ErrorRecorder {
    fn default() -> Self {
        Self::new()
    }
}
