//! Assembles and starts loops.

use std::fmt::{self, Debug};
use std::hash::Hash;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::logger::{LoggingInitiator, LoggingUpdate};
use crate::logic::identity_initiator;
use crate::processor::{EventProcessor, EventQueue};
use crate::runtime::{default_effect_spawner, EffectDispatcher};
use crate::{
    Connectable, ErrorHandler, EventSource, Initiate, Logger, MobiusLoop, ModelPublisher, Next, NoEventSource,
    Spawner, ThreadSpawner, Update,
};

/// Configuration for starting [`MobiusLoop`]s.
///
/// Only the update function and the effect handler are required. The rest
/// defaults to an initiator that changes nothing and dispatches nothing, no
/// event source, a dedicated thread for events, a thread pool for effects, no
/// logger and an error handler that logs and aborts.
///
/// Every `with_*` method consumes the builder and returns a new one. Builders
/// are cheap to clone, so a base configuration can be kept and varied.
///
/// # Example
///
/// ```rust
/// use mobius_loop::{Builder, Connection, Emitter, ErrorRecorder, ImmediateSpawner, TestExecutor};
///
/// fn update(count: &mut u32, event: u32) -> Vec<()> {
///     *count += event;
///     Vec::new()
/// }
///
/// let executor = TestExecutor::new();
/// let errors = ErrorRecorder::new();
/// let builder = Builder::new(update, |_: Emitter<u32>| Connection::new(|_: ()| {}, || {}))
///     .with_event_spawner(executor.clone())
///     .with_effect_spawner(ImmediateSpawner)
///     .with_error_handler(errors.handler());
///
/// let first = builder.start(0);
/// let second = builder.start(10);
/// first.dispatch_event(1);
/// second.dispatch_event(2);
/// executor.run_until_stalled();
///
/// assert_eq!(first.most_recent_model(), 1);
/// assert_eq!(second.most_recent_model(), 12);
/// ```
pub struct Builder<Model, Event, Effect> {
    update: Arc<dyn Update<Model, Event, Effect>>,
    effect_handler: Arc<dyn Connectable<Effect, Event>>,
    initiator: Arc<dyn Initiate<Model, Effect>>,
    event_source: Arc<dyn EventSource<Event>>,
    event_spawner: Arc<dyn Spawner>,
    effect_spawner: Option<Arc<dyn Spawner>>,
    logger: Option<Arc<dyn Logger<Model, Event, Effect>>>,
    errors: ErrorHandler,
}

impl<Model, Event, Effect> Clone for Builder<Model, Event, Effect> {
    fn clone(&self) -> Self {
        Self {
            update: Arc::clone(&self.update),
            effect_handler: Arc::clone(&self.effect_handler),
            initiator: Arc::clone(&self.initiator),
            event_source: Arc::clone(&self.event_source),
            event_spawner: Arc::clone(&self.event_spawner),
            effect_spawner: self.effect_spawner.clone(),
            logger: self.logger.clone(),
            errors: self.errors.clone(),
        }
    }
}

impl<Model, Event, Effect> Builder<Model, Event, Effect>
where
    Model: Clone + Send + 'static,
    Event: Clone + Debug + Send + 'static,
    Effect: Eq + Hash + Debug + Send + 'static,
{
    pub fn new<U, H>(update: U, effect_handler: H) -> Self
    where
        U: Update<Model, Event, Effect> + 'static,
        H: Connectable<Effect, Event> + 'static,
    {
        Self {
            update: Arc::new(update),
            effect_handler: Arc::new(effect_handler),
            initiator: Arc::new(identity_initiator::<Model, Effect>),
            event_source: Arc::new(NoEventSource),
            event_spawner: Arc::new(ThreadSpawner::default()),
            effect_spawner: None,
            logger: None,
            errors: ErrorHandler::default(),
        }
    }

    /// Run `initiator` on the seed model of every started loop.
    pub fn with_initiator<I>(self, initiator: I) -> Self
    where
        I: Initiate<Model, Effect> + 'static,
    {
        Self {
            initiator: Arc::new(initiator),
            ..self
        }
    }

    pub fn with_event_source<S>(self, event_source: S) -> Self
    where
        S: EventSource<Event> + 'static,
    {
        Self {
            event_source: Arc::new(event_source),
            ..self
        }
    }

    /// Context the update function runs on. It receives one long-lived
    /// future per loop.
    pub fn with_event_spawner<S>(self, spawner: S) -> Self
    where
        S: Spawner + 'static,
    {
        Self {
            event_spawner: Arc::new(spawner),
            ..self
        }
    }

    /// Context effect handlers run on. It receives one short future per
    /// dispatched effect.
    pub fn with_effect_spawner<S>(self, spawner: S) -> Self
    where
        S: Spawner + 'static,
    {
        Self {
            effect_spawner: Some(Arc::new(spawner)),
            ..self
        }
    }

    pub fn with_logger<L>(self, logger: L) -> Self
    where
        L: Logger<Model, Event, Effect> + 'static,
    {
        Self {
            logger: Some(Arc::new(logger)),
            ..self
        }
    }

    /// Where misuse such as an unhandled effect is reported.
    pub fn with_error_handler(self, errors: ErrorHandler) -> Self {
        Self { errors, ..self }
    }

    /// Start a loop from `initial_model`.
    ///
    /// The effect handler is connected first. The initiator then runs on the
    /// calling thread, so the first model is observable as soon as this
    /// returns. The event source is subscribed last. Events emitted while
    /// connecting or subscribing are applied after initiation, in order.
    ///
    /// Each call starts an independent loop.
    pub fn start(&self, initial_model: Model) -> MobiusLoop<Model, Event, Effect> {
        let publisher = ModelPublisher::new(initial_model.clone(), self.errors.clone());
        let (queue, events, shutdown) = EventQueue::new(self.errors.clone());
        let disposed = Arc::new(AtomicBool::new(false));

        let effects = Arc::new(self.effect_handler.connect(queue.emitter()));
        let effect_spawner = self.effect_spawner.clone().unwrap_or_else(default_effect_spawner);
        let dispatcher = EffectDispatcher::new(Arc::clone(&effects), effect_spawner, Arc::clone(&disposed));

        let publish = {
            let publisher = Arc::clone(&publisher);
            move |next: Next<Model, Effect>| {
                let (model, effects) = next.into_parts();
                if let Some(model) = model {
                    publisher.post(model);
                }
                for effect in effects {
                    dispatcher.dispatch(effect);
                }
            }
        };

        let (update, initiator) = match &self.logger {
            Some(logger) => (
                Arc::new(LoggingUpdate::new(Arc::clone(&self.update), Arc::clone(logger)))
                    as Arc<dyn Update<Model, Event, Effect>>,
                Arc::new(LoggingInitiator::new(Arc::clone(&self.initiator), Arc::clone(logger)))
                    as Arc<dyn Initiate<Model, Effect>>,
            ),
            None => (Arc::clone(&self.update), Arc::clone(&self.initiator)),
        };

        let mut processor = EventProcessor::new(update, initiator, self.errors.clone(), publish);
        processor.init(initial_model);

        let event_source = self
            .event_source
            .subscribe(queue.emitter().gated(Arc::clone(&disposed)));

        self.event_spawner.spawn(Box::pin(processor.run(events, shutdown)));
        tracing::debug!("loop started");

        MobiusLoop::new(queue, publisher, effects, event_source, disposed)
    }
}

impl<Model, Event, Effect> Debug for Builder<Model, Event, Effect> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("custom_effect_spawner", &self.effect_spawner.is_some())
            .field("logging", &self.logger.is_some())
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}
