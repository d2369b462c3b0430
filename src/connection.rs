//! Connections, connectables and subscriptions: the boundaries of a loop.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use spin::Mutex;

use crate::Emitter;

type DisposeFn = Box<dyn FnOnce() + Send>;

/// An accept/dispose pair at a component boundary.
///
/// `dispose` runs at most once. After it has run, `accept` silently ignores
/// every value, so late asynchronous completions cannot reach a torn-down
/// component.
///
/// # Example
///
/// ```rust
/// use mobius_loop::Connection;
///
/// let connection = Connection::new(|effect: &str| println!("{effect}"), || {});
/// connection.accept("load");
/// connection.dispose();
/// connection.accept("ignored");
/// assert!(connection.is_disposed());
/// ```
pub struct Connection<T> {
    accept: Box<dyn Fn(T) + Send + Sync>,
    dispose: Mutex<Option<DisposeFn>>,
    disposed: AtomicBool,
}

impl<T> Connection<T> {
    pub fn new<A, D>(accept: A, dispose: D) -> Self
    where
        A: Fn(T) + Send + Sync + 'static,
        D: FnOnce() + Send + 'static,
    {
        Self {
            accept: Box::new(accept),
            dispose: Mutex::new(Some(Box::new(dispose))),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn accept(&self, value: T) {
        if self.is_disposed() {
            return;
        }
        (self.accept)(value);
    }

    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let dispose = self.dispose.lock().take();
        if let Some(dispose) = dispose {
            dispose();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl<T: 'static> Connection<T> {
    /// A connection that discards everything it is given.
    pub fn broken() -> Self {
        Self::new(|_| {}, || {})
    }
}

impl<T> fmt::Debug for Connection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Something a loop can connect to: given a consumer for its output, it
/// returns a [`Connection`] accepting its input.
///
/// The loop connects its effect handling this way: `Input` is the effect
/// type and `Output` is the event type.
///
/// Closures and functions with the matching signature implement this trait
/// via the blanket implementation.
pub trait Connectable<Input, Output>: Send + Sync {
    fn connect(&self, consumer: Emitter<Output>) -> Connection<Input>;
}

impl<Input, Output, F> Connectable<Input, Output> for F
where
    F: Fn(Emitter<Output>) -> Connection<Input> + Send + Sync,
{
    fn connect(&self, consumer: Emitter<Output>) -> Connection<Input> {
        self(consumer)
    }
}

/// Handle returned by every subscribe operation.
///
/// [`dispose`](Self::dispose) detaches exactly one subscriber and is
/// idempotent. Dropping the handle does not dispose it.
pub struct Subscription {
    dispose: Mutex<Option<DisposeFn>>,
}

impl Subscription {
    pub fn new<D>(dispose: D) -> Self
    where
        D: FnOnce() + Send + 'static,
    {
        Self {
            dispose: Mutex::new(Some(Box::new(dispose))),
        }
    }

    /// A subscription with nothing to dispose.
    pub fn empty() -> Self {
        Self {
            dispose: Mutex::new(None),
        }
    }

    pub fn dispose(&self) {
        let dispose = self.dispose.lock().take();
        if let Some(dispose) = dispose {
            dispose();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.dispose.lock().is_some())
            .finish()
    }
}

#[cfg(any(test, feature = "testing"))]
use std::sync::Arc;

#[cfg(any(test, feature = "testing"))]
struct Recording<Input, Output> {
    accepted: Vec<Input>,
    consumer: Option<Emitter<Output>>,
    disposed: bool,
}

#[cfg(any(test, feature = "testing"))]
/// Connectable that records what it is given.
///
/// Only available with the `testing` feature.
///
/// Every accepted value is captured, the consumer handed to
/// [`connect`](Connectable::connect) is kept so tests can
/// [`dispatch`](Self::dispatch) events through it, and disposal is recorded.
///
/// # Example
///
/// ```rust
/// use mobius_loop::{Connectable, Emitter, RecordingConnectable};
///
/// let recording = RecordingConnectable::<&str, &str>::new();
/// let (sender, receiver) = flume::unbounded();
///
/// let connection = recording.connect(Emitter::new(sender));
/// connection.accept("effect");
/// recording.dispatch("event");
///
/// assert_eq!(recording.accepted(), vec!["effect"]);
/// assert_eq!(receiver.try_recv(), Ok("event"));
/// ```
pub struct RecordingConnectable<Input, Output> {
    state: Arc<Mutex<Recording<Input, Output>>>,
}

#[cfg(any(test, feature = "testing"))]
impl<Input, Output> Clone for RecordingConnectable<Input, Output> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

#[cfg(any(test, feature = "testing"))]
impl<Input, Output> Default for RecordingConnectable<Input, Output> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "testing"))]
impl<Input, Output> RecordingConnectable<Input, Output> {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(Recording {
                accepted: Vec::new(),
                consumer: None,
                disposed: false,
            })),
        }
    }

    /// Send an event through the consumer of the latest connection.
    pub fn dispatch(&self, event: Output) {
        let consumer = self.state.lock().consumer.clone();
        if let Some(consumer) = consumer {
            consumer.emit(event);
        }
    }

    pub fn accepted(&self) -> Vec<Input>
    where
        Input: Clone,
    {
        self.state.lock().accepted.clone()
    }

    pub fn clear(&self) {
        self.state.lock().accepted.clear();
    }

    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }
}

#[cfg(any(test, feature = "testing"))]
impl<Input, Output> Connectable<Input, Output> for RecordingConnectable<Input, Output>
where
    Input: Send + 'static,
    Output: Send + 'static,
{
    fn connect(&self, consumer: Emitter<Output>) -> Connection<Input> {
        self.state.lock().consumer = Some(consumer);

        let accepting = Arc::clone(&self.state);
        let disposing = Arc::clone(&self.state);
        Connection::new(
            move |value| accepting.lock().accepted.push(value),
            move || disposing.lock().disposed = true,
        )
    }
}
