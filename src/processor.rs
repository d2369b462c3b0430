//! Serialized application of events to the model.

use std::collections::VecDeque;
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use flume::{Receiver, Sender};
use futures::FutureExt;
use spin::Mutex;

use crate::{Emitter, ErrorHandler, Initiate, LoopError, Next, Update};

type Publish<Model, Effect> = Box<dyn FnMut(Next<Model, Effect>) + Send>;

/// Owns the model and applies the transition function to it, one event at a time.
///
/// Every outcome is handed to the `publish` callback as a [`Next`]: the new
/// model first, then its de-duplicated effects in the order returned. Events
/// accepted before [`init`](Self::init) are buffered and replayed after it.
///
/// Inside a loop the processor is driven by [`run`](Self::run) on the event
/// context, which is what serializes transitions.
pub struct EventProcessor<Model, Event, Effect> {
    update: Arc<dyn Update<Model, Event, Effect>>,
    initiate: Arc<dyn Initiate<Model, Effect>>,
    errors: ErrorHandler,
    publish: Publish<Model, Effect>,
    model: Option<Model>,
    queued: VecDeque<Event>,
}

impl<Model, Event, Effect> EventProcessor<Model, Event, Effect>
where
    Model: Clone,
    Effect: Eq + Hash,
{
    pub fn new<P>(
        update: Arc<dyn Update<Model, Event, Effect>>,
        initiate: Arc<dyn Initiate<Model, Effect>>,
        errors: ErrorHandler,
        publish: P,
    ) -> Self
    where
        P: FnMut(Next<Model, Effect>) + Send + 'static,
    {
        Self {
            update,
            initiate,
            errors,
            publish: Box::new(publish),
            model: None,
            queued: VecDeque::new(),
        }
    }

    /// Run the initiator on the seed model, publish the outcome, then replay
    /// any events accepted so far.
    pub fn init(&mut self, model: Model) {
        if self.model.is_some() {
            self.errors.report(LoopError::AlreadyInitialized);
            return;
        }

        let mut model = model;
        let effects = self.initiate.initiate(&mut model);
        self.model = Some(model.clone());
        (self.publish)(Next::next(model, effects));

        while let Some(event) = self.queued.pop_front() {
            self.apply(event);
        }
    }

    /// Apply `event`, or buffer it if the processor is not initialized yet.
    pub fn accept(&mut self, event: Event) {
        if self.model.is_none() {
            self.queued.push_back(event);
            return;
        }
        self.apply(event);
    }

    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.model.is_some()
    }

    fn apply(&mut self, event: Event) {
        let Some(model) = self.model.as_mut() else {
            return;
        };
        let effects = self.update.update(model, event);
        let next = Next::next(model.clone(), effects);
        (self.publish)(next);
    }

    /// Drain `events` until `shutdown` fires or every sender is gone.
    ///
    /// Shutdown is checked before each event, so nothing queued behind it is
    /// applied.
    pub(crate) async fn run(mut self, events: Receiver<Event>, shutdown: Receiver<()>) {
        loop {
            let received = futures::select_biased! {
                _ = shutdown.recv_async().fuse() => None,
                event = events.recv_async().fuse() => event.ok(),
            };
            let Some(event) = received else {
                break;
            };
            tracing::trace!(queued = events.len(), "processing event");
            self.accept(event);
        }
        tracing::debug!("event processor stopped");
    }
}

impl<Model: Debug, Event: Debug, Effect> Debug for EventProcessor<Model, Event, Effect> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventProcessor")
            .field("model", &self.model)
            .field("queued", &self.queued)
            .finish()
    }
}

/// Submitting half of an [`EventProcessor`]'s queue.
///
/// Closing it fires the shutdown signal the processor's drain loop waits on.
/// Events accepted between [`close`](Self::close) and
/// [`dispose`](Self::dispose) raced the teardown and are dropped quietly;
/// only events accepted after `dispose` are reported.
pub(crate) struct EventQueue<Event> {
    sender: Sender<Event>,
    shutdown: Mutex<Option<Sender<()>>>,
    settled: AtomicBool,
    errors: ErrorHandler,
}

impl<Event> EventQueue<Event> {
    /// The queue plus the event and shutdown receivers for [`EventProcessor::run`].
    pub(crate) fn new(errors: ErrorHandler) -> (Self, Receiver<Event>, Receiver<()>) {
        let (sender, events) = flume::unbounded();
        let (shutdown, shutdown_signal) = flume::bounded(1);
        let queue = Self {
            sender,
            shutdown: Mutex::new(Some(shutdown)),
            settled: AtomicBool::new(false),
            errors,
        };
        (queue, events, shutdown_signal)
    }

    /// Emitter for effect handlers and event sources; silent after disposal.
    pub(crate) fn emitter(&self) -> Emitter<Event> {
        Emitter::new(self.sender.clone())
    }

    /// Stop the drain loop without reporting late events yet.
    pub(crate) fn close(&self) {
        let shutdown = self.shutdown.lock().take();
        drop(shutdown);
    }

    /// Close the queue; from now on accepted events are reported.
    pub(crate) fn dispose(&self) {
        self.close();
        self.settled.store(true, Ordering::Release);
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.shutdown.lock().is_none()
    }
}

impl<Event: Debug> EventQueue<Event> {
    /// Queue `event`, or report it if the queue has been disposed.
    pub(crate) fn accept(&self, event: Event) {
        if self.is_disposed() {
            if self.settled.load(Ordering::Acquire) {
                self.errors.report(LoopError::DispatchAfterDispose {
                    event: format!("{event:?}"),
                });
            } else {
                tracing::debug!(?event, "dropping event dispatched during disposal");
            }
            return;
        }
        self.sender.send(event).ok();
    }
}

impl<Event> Debug for EventQueue<Event> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventProcessor")
            .field("queued_events", &self.sender.len())
            .field("accepting", &self.shutdown.lock().is_some())
            .finish()
    }
}
