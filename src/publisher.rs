//! Replay-latest fan-out of models to observers.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, MutexGuard, PoisonError, Weak};

use spin::Mutex;

use crate::{ErrorHandler, LoopError, Subscription};

type Observer<Model> = Box<dyn FnMut(Model) + Send>;

/// One registered observer.
///
/// `delivered` is the sequence number of the last model handed to the
/// observer; older models are never delivered after newer ones.
///
/// The observer runs while its slot is locked, so a post reaching an
/// observer that is still handling its replay waits for it. The lock blocks
/// instead of spinning because observer callbacks can be slow.
struct Slot<Model> {
    active: AtomicBool,
    inner: std::sync::Mutex<SlotInner<Model>>,
}

struct SlotInner<Model> {
    observer: Observer<Model>,
    delivered: u64,
}

impl<Model: Clone> Slot<Model> {
    fn new(observer: Observer<Model>) -> Self {
        Self {
            active: AtomicBool::new(true),
            inner: std::sync::Mutex::new(SlotInner { observer, delivered: 0 }),
        }
    }

    // A panicking observer must not silence the others.
    fn lock(&self) -> MutexGuard<'_, SlotInner<Model>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn deliver(&self, sequence: u64, model: &Model) {
        if !self.active.load(Ordering::Acquire) {
            return;
        }
        let mut inner = self.lock();
        if sequence <= inner.delivered || !self.active.load(Ordering::Acquire) {
            return;
        }
        inner.delivered = sequence;
        (inner.observer)(model.clone());
    }
}

struct State<Model> {
    current: (u64, Model),
    observers: Vec<(u64, Arc<Slot<Model>>)>,
    next_id: u64,
    disposed: bool,
}

/// Publishes models to any number of observers.
///
/// A new observer first receives the model current when it connected, then
/// every model posted afterwards, in order, until its subscription is
/// disposed.
pub struct ModelPublisher<Model> {
    state: Mutex<State<Model>>,
    errors: ErrorHandler,
}

impl<Model> ModelPublisher<Model>
where
    Model: Clone + Send + 'static,
{
    /// A publisher whose current model is `model`.
    pub fn new(model: Model, errors: ErrorHandler) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State {
                current: (0, model),
                observers: Vec::new(),
                next_id: 0,
                disposed: false,
            }),
            errors,
        })
    }

    /// Register `observer` and replay the current model to it.
    ///
    /// The replay is always the observer's first delivery: the slot is
    /// locked before the publisher is released, so a concurrent
    /// [`post`](Self::post) is handed over only after it.
    ///
    /// After [`dispose`](Self::dispose) this reports
    /// [`LoopError::ObserveAfterDispose`] and returns an empty subscription.
    pub fn connect<F>(self: &Arc<Self>, observer: F) -> Subscription
    where
        F: FnMut(Model) + Send + 'static,
    {
        let slot = Arc::new(Slot::new(Box::new(observer)));

        let id = {
            let mut state = self.state.lock();
            if state.disposed {
                drop(state);
                self.errors.report(LoopError::ObserveAfterDispose);
                return Subscription::empty();
            }
            let id = state.next_id;
            state.next_id += 1;
            state.observers.push((id, Arc::clone(&slot)));

            let mut inner = slot.lock();
            let (sequence, model) = state.current.clone();
            drop(state);

            inner.delivered = sequence;
            (inner.observer)(model);
            id
        };

        let publisher = Arc::downgrade(self);
        Subscription::new(move || {
            slot.active.store(false, Ordering::Release);
            if let Some(publisher) = Weak::upgrade(&publisher) {
                publisher.disconnect(id);
            }
        })
    }

    /// Make `model` the current model and deliver it to every observer.
    pub fn post(&self, model: Model) {
        let (sequence, observers) = {
            let mut state = self.state.lock();
            if state.disposed {
                return;
            }
            let sequence = state.current.0 + 1;
            state.current = (sequence, model.clone());
            let observers: Vec<_> = state.observers.iter().map(|(_, slot)| Arc::clone(slot)).collect();
            (sequence, observers)
        };

        for slot in observers {
            slot.deliver(sequence, &model);
        }
    }

    /// Snapshot of the latest posted model.
    pub fn current(&self) -> Model {
        self.state.lock().current.1.clone()
    }
}

impl<Model> ModelPublisher<Model> {
    pub fn observer_count(&self) -> usize {
        self.state.lock().observers.len()
    }

    /// Detach every observer. Later posts are ignored; the current model is kept.
    pub fn dispose(&self) {
        let observers = {
            let mut state = self.state.lock();
            state.disposed = true;
            std::mem::take(&mut state.observers)
        };
        for (_, slot) in observers {
            slot.active.store(false, Ordering::Release);
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    fn disconnect(&self, id: u64) {
        self.state.lock().observers.retain(|(observer, _)| *observer != id);
    }
}

impl<Model: fmt::Debug> fmt::Debug for ModelPublisher<Model> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ModelPublisher")
            .field("current", &state.current.1)
            .field("observers", &state.observers.len())
            .field("disposed", &state.disposed)
            .finish()
    }
}

#[cfg(any(test, feature = "testing"))]
/// Observer that captures every model it receives for assertions.
///
/// Only available with the `testing` feature.
///
/// # Example
///
/// ```rust
/// use mobius_loop::{ErrorHandler, ModelPublisher, ModelRecorder};
///
/// let publisher = ModelPublisher::new("first", ErrorHandler::default());
///
/// let recorder = ModelRecorder::new();
/// let _subscription = publisher.connect(recorder.observer());
/// publisher.post("second");
///
/// assert_eq!(recorder.models(), vec!["first", "second"]);
/// ```
pub struct ModelRecorder<Model> {
    models: Arc<Mutex<Vec<Model>>>,
}

#[cfg(any(test, feature = "testing"))]
impl<Model> Clone for ModelRecorder<Model> {
    fn clone(&self) -> Self {
        Self {
            models: Arc::clone(&self.models),
        }
    }
}

#[cfg(any(test, feature = "testing"))]
impl<Model: Send + 'static> Default for ModelRecorder<Model> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "testing"))]
impl<Model: Send + 'static> ModelRecorder<Model> {
    pub fn new() -> Self {
        Self {
            models: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// An observer that appends to this recorder.
    pub fn observer(&self) -> impl FnMut(Model) + Send + 'static {
        let models = Arc::clone(&self.models);
        move |model| models.lock().push(model)
    }

    /// Get the number of models that have been observed.
    pub fn count(&self) -> usize {
        self.models.lock().len()
    }

    pub fn models(&self) -> Vec<Model>
    where
        Model: Clone,
    {
        self.models.lock().clone()
    }

    pub fn clear(&self) {
        self.models.lock().clear();
    }

    /// Access the captured models with a closure.
    pub fn with_models<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Vec<Model>) -> R,
    {
        let models = self.models.lock();
        f(&models)
    }
}
