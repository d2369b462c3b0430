//! The loop runtime: execution contexts and the `MobiusLoop` façade.

use core::future::Future;
use core::pin::Pin;

use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::processor::EventQueue;
use crate::{Connection, ModelPublisher, Subscription};

/// A spawner trait for executing futures on an execution context.
///
/// A loop uses two of them: the event context runs the single future that
/// applies events (so transitions are serial no matter how the spawner
/// schedules), and the effect context runs one future per dispatched effect.
///
/// This abstraction allows you to use whatever concurrency model you want (tokio, async-std, a UI thread, etc.).
///
/// Function pointers and closures automatically implement this trait via the blanket implementation.
pub trait Spawner: Send + Sync {
    /// Spawn a future on the execution context.
    fn spawn(&self, future: Pin<Box<dyn Future<Output = ()> + Send>>);
}

/// Implement Spawner for any callable type that matches the signature.
///
/// This includes function pointers, closures, and function items.
impl<F> Spawner for F
where
    F: Fn(Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync,
{
    fn spawn(&self, future: Pin<Box<dyn Future<Output = ()> + Send>>) {
        self(future)
    }
}

/// Runs each spawned future to completion on its own named OS thread.
///
/// The default event context: a loop spawns exactly one long-lived future on
/// it, so each loop gets one background thread for its transitions.
#[derive(Debug, Clone)]
pub struct ThreadSpawner {
    name: String,
}

impl ThreadSpawner {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for ThreadSpawner {
    fn default() -> Self {
        Self::new("mobius-events")
    }
}

impl Spawner for ThreadSpawner {
    fn spawn(&self, future: Pin<Box<dyn Future<Output = ()> + Send>>) {
        let spawned = std::thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || futures::executor::block_on(future));
        if let Err(error) = spawned {
            tracing::error!(%error, thread = %self.name, "failed to spawn execution thread");
        }
    }
}

struct PoolSpawner(futures::executor::ThreadPool);

impl Spawner for PoolSpawner {
    fn spawn(&self, future: Pin<Box<dyn Future<Output = ()> + Send>>) {
        self.0.spawn_ok(future);
    }
}

/// The default effect context: a `futures` thread pool per loop.
pub(crate) fn default_effect_spawner() -> Arc<dyn Spawner> {
    match futures::executor::ThreadPool::builder()
        .name_prefix("mobius-effects-")
        .create()
    {
        Ok(pool) => Arc::new(PoolSpawner(pool)),
        Err(error) => {
            tracing::warn!(%error, "effect thread pool unavailable, running effects on dedicated threads");
            Arc::new(ThreadSpawner::new("mobius-effects"))
        }
    }
}

/// Hands each effect to the effect connection on the effect context.
///
/// Nothing is spawned once the loop is disposed, and a spawned effect that
/// starts after disposal is dropped.
pub(crate) struct EffectDispatcher<Effect> {
    connection: Arc<Connection<Effect>>,
    spawner: Arc<dyn Spawner>,
    disposed: Arc<AtomicBool>,
}

impl<Effect: Debug + Send + 'static> EffectDispatcher<Effect> {
    pub(crate) fn new(
        connection: Arc<Connection<Effect>>,
        spawner: Arc<dyn Spawner>,
        disposed: Arc<AtomicBool>,
    ) -> Self {
        Self {
            connection,
            spawner,
            disposed,
        }
    }

    pub(crate) fn dispatch(&self, effect: Effect) {
        if self.disposed.load(Ordering::Acquire) {
            return;
        }
        tracing::trace!(?effect, "dispatching effect");
        let connection = Arc::clone(&self.connection);
        let disposed = Arc::clone(&self.disposed);
        self.spawner.spawn(Box::pin(async move {
            if !disposed.load(Ordering::Acquire) {
                connection.accept(effect);
            }
        }));
    }
}

/// A running loop.
///
/// Holds the model behind a serialized event pipeline: events from
/// [`dispatch_event`](Self::dispatch_event), the event source and effect
/// handlers are applied one at a time on the event context. Every resulting
/// model is published to observers and every effect is handed to the effect
/// handler on the effect context.
///
/// Created by [`Builder::start`](crate::Builder::start). The loop lives until
/// [`dispose`](Self::dispose) is called or it is dropped. Disposal is terminal.
///
/// See the [crate-level documentation](crate) for a complete example.
///
/// # Type Parameters
///
/// * `Model` - The state type of the loop
/// * `Event` - The event type applied by the update function
/// * `Effect` - The effect type produced by the update function
pub struct MobiusLoop<Model, Event, Effect> {
    queue: EventQueue<Event>,
    publisher: Arc<ModelPublisher<Model>>,
    effects: Arc<Connection<Effect>>,
    event_source: Subscription,
    disposed: Arc<AtomicBool>,
}

impl<Model, Event, Effect> MobiusLoop<Model, Event, Effect> {
    pub(crate) fn new(
        queue: EventQueue<Event>,
        publisher: Arc<ModelPublisher<Model>>,
        effects: Arc<Connection<Effect>>,
        event_source: Subscription,
        disposed: Arc<AtomicBool>,
    ) -> Self {
        Self {
            queue,
            publisher,
            effects,
            event_source,
            disposed,
        }
    }

    /// Stop the loop.
    ///
    /// Tears down, in order, the event processor, the event source
    /// subscription, the model observers and the effect connection (which
    /// stops the effect handlers). Once this returns no observer is notified
    /// and no new effect is dispatched. Calling it again does nothing.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.queue.close();
        self.event_source.dispose();
        self.publisher.dispose();
        self.effects.dispose();
        self.queue.dispose();
        tracing::debug!("loop disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl<Model, Event, Effect> MobiusLoop<Model, Event, Effect>
where
    Model: Clone + Send + 'static,
    Event: Debug,
{
    /// Queue an event for the update function.
    ///
    /// Events from one caller are applied in the order they were dispatched;
    /// events from concurrent callers are applied one at a time in some
    /// interleaving. Once [`dispose`](Self::dispose) has returned this
    /// reports [`LoopError::DispatchAfterDispose`](crate::LoopError::DispatchAfterDispose)
    /// and does nothing else. An event dispatched while another thread is
    /// still disposing the loop is dropped without a report.
    pub fn dispatch_event(&self, event: Event) {
        self.queue.accept(event);
    }

    /// Observe the model.
    ///
    /// The current model is delivered immediately, then every later model, in
    /// order, until the returned subscription is disposed. After
    /// [`dispose`](Self::dispose) this reports
    /// [`LoopError::ObserveAfterDispose`](crate::LoopError::ObserveAfterDispose).
    pub fn add_observer<F>(&self, observer: F) -> Subscription
    where
        F: FnMut(Model) + Send + 'static,
    {
        self.publisher.connect(observer)
    }

    /// Snapshot of the latest published model.
    ///
    /// The initiator has already run when the loop is handed out, so there
    /// is always a model. Still available after disposal.
    pub fn most_recent_model(&self) -> Model {
        self.publisher.current()
    }
}

impl<Model, Event, Effect> Drop for MobiusLoop<Model, Event, Effect> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<Model, Event, Effect> Debug for MobiusLoop<Model, Event, Effect> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_disposed() {
            return f.write_str("disposed MobiusLoop");
        }
        f.debug_struct("MobiusLoop")
            .field("processor", &self.queue)
            .finish()
    }
}

#[cfg(any(test, feature = "testing"))]
mod testing {
    use core::future::Future;
    use core::pin::Pin;
    use core::task::{Context, Poll};

    use std::sync::Arc;

    use futures::future::BoxFuture;
    use futures::task::{waker_ref, ArcWake};
    use spin::Mutex;

    use super::Spawner;

    struct Task {
        future: Mutex<Option<BoxFuture<'static, ()>>>,
        queue: flume::Sender<Arc<Task>>,
    }

    impl Task {
        fn poll(self: &Arc<Self>) {
            let Some(mut future) = self.future.lock().take() else {
                return;
            };
            let waker = waker_ref(self);
            let mut cx = Context::from_waker(&waker);
            if future.as_mut().poll(&mut cx).is_pending() {
                *self.future.lock() = Some(future);
            }
        }

        fn is_complete(&self) -> bool {
            self.future.lock().is_none()
        }
    }

    impl ArcWake for Task {
        fn wake_by_ref(arc_self: &Arc<Self>) {
            arc_self.queue.send(Arc::clone(arc_self)).ok();
        }
    }

    struct Inner {
        sender: flume::Sender<Arc<Task>>,
        ready: flume::Receiver<Arc<Task>>,
        tasks: Mutex<Vec<Arc<Task>>>,
    }

    /// Single-threaded executor driven by hand.
    ///
    /// Only available with the `testing` feature or during tests.
    ///
    /// Spawned futures do nothing until [`run_until_stalled`](Self::run_until_stalled)
    /// is called, which polls every woken future until none is ready. Using it
    /// for both contexts of a loop makes every transition and effect happen at
    /// a point the test chooses.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::sync::atomic::{AtomicBool, Ordering};
    /// use std::sync::Arc;
    /// use mobius_loop::{Spawner, TestExecutor};
    ///
    /// let executor = TestExecutor::new();
    /// let ran = Arc::new(AtomicBool::new(false));
    /// let flag = ran.clone();
    /// executor.spawn(Box::pin(async move { flag.store(true, Ordering::SeqCst) }));
    ///
    /// assert!(!ran.load(Ordering::SeqCst));
    /// executor.run_until_stalled();
    /// assert!(ran.load(Ordering::SeqCst));
    /// assert!(executor.is_idle());
    /// ```
    #[derive(Clone)]
    pub struct TestExecutor {
        inner: Arc<Inner>,
    }

    impl Default for TestExecutor {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestExecutor {
        pub fn new() -> Self {
            let (sender, ready) = flume::unbounded();
            Self {
                inner: Arc::new(Inner {
                    sender,
                    ready,
                    tasks: Mutex::new(Vec::new()),
                }),
            }
        }

        /// Poll woken futures until none is ready to make progress.
        pub fn run_until_stalled(&self) {
            while let Ok(task) = self.inner.ready.try_recv() {
                task.poll();
            }
            self.inner.tasks.lock().retain(|task| !task.is_complete());
        }

        /// Whether every spawned future has completed.
        pub fn is_idle(&self) -> bool {
            self.inner.tasks.lock().iter().all(|task| task.is_complete())
        }

        /// Number of spawned futures that have not completed.
        pub fn pending(&self) -> usize {
            self.inner.tasks.lock().iter().filter(|task| !task.is_complete()).count()
        }

        /// A spawner that spawns onto this executor.
        pub fn spawner(&self) -> Arc<dyn Spawner> {
            Arc::new(self.clone())
        }
    }

    impl Spawner for TestExecutor {
        fn spawn(&self, future: Pin<Box<dyn Future<Output = ()> + Send>>) {
            let task = Arc::new(Task {
                future: Mutex::new(Some(future)),
                queue: self.inner.sender.clone(),
            });
            self.inner.tasks.lock().push(Arc::clone(&task));
            self.inner.sender.send(task).ok();
        }
    }

    impl Drop for Inner {
        fn drop(&mut self) {
            // Queued tasks hold a sender to the ready queue.
            while let Ok(task) = self.ready.try_recv() {
                task.future.lock().take();
            }
            for task in self.tasks.get_mut().drain(..) {
                task.future.lock().take();
            }
        }
    }

    impl core::fmt::Debug for TestExecutor {
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            f.debug_struct("TestExecutor")
                .field("ready", &self.inner.ready.len())
                .field("pending", &self.pending())
                .finish()
        }
    }

    /// Spawner that polls each future once, inline, on the spawning thread.
    ///
    /// Only available with the `testing` feature or during tests.
    ///
    /// Suits the effect context, whose futures complete on their first poll.
    /// A future that is still pending after its first poll is dropped with a
    /// warning, so never use it for the event context.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct ImmediateSpawner;

    impl Spawner for ImmediateSpawner {
        fn spawn(&self, mut future: Pin<Box<dyn Future<Output = ()> + Send>>) {
            let mut cx = Context::from_waker(futures::task::noop_waker_ref());
            if let Poll::Pending = future.as_mut().poll(&mut cx) {
                tracing::warn!("immediate spawner dropped a future that did not complete");
            }
        }
    }
}

#[cfg(any(test, feature = "testing"))]
pub use testing::{ImmediateSpawner, TestExecutor};
