use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::{Connectable, Connection, EffectHandler, Emitter, ErrorHandler, LoopError, Resolution};

/// Adapts an [`EffectHandler`] into the [`Connectable`] a loop needs.
///
/// Each effect accepted by the connection is resolved against the handler:
/// an unclaimed effect is reported as [`LoopError::UnhandledEffect`], an effect
/// claimed by several handlers as [`LoopError::AmbiguousEffect`], and a
/// matched effect runs the handler. Either error drops the effect.
///
/// One handler instance serves one loop at a time. Connecting it again while
/// connected reports [`LoopError::AlreadyConnected`] and yields a connection
/// that discards everything. Disposing the connection closes the emitter given
/// to the handler, calls [`EffectHandler::stop`] and makes the handler
/// connectable again.
pub struct EffectHandlerConnectable<H> {
    handler: Arc<H>,
    connected: Arc<AtomicBool>,
    errors: ErrorHandler,
}

impl<H> EffectHandlerConnectable<H> {
    pub fn new(handler: H, errors: ErrorHandler) -> Self {
        Self {
            handler: Arc::new(handler),
            connected: Arc::new(AtomicBool::new(false)),
            errors,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

impl<H, Effect, Event> Connectable<Effect, Event> for EffectHandlerConnectable<H>
where
    H: EffectHandler<Effect, Event> + 'static,
    Effect: Debug + 'static,
    Event: Send + 'static,
{
    fn connect(&self, consumer: Emitter<Event>) -> Connection<Effect> {
        if self.connected.swap(true, Ordering::AcqRel) {
            self.errors.report(LoopError::AlreadyConnected);
            return Connection::broken();
        }

        let cancelled = Arc::new(AtomicBool::new(false));
        let emitter = consumer.gated(Arc::clone(&cancelled));

        let handler = Arc::clone(&self.handler);
        let errors = self.errors.clone();
        let accept = move |effect: Effect| match handler.resolve(&effect) {
            Resolution::Matched(payload) => handler.run(payload, &emitter),
            Resolution::Unmatched => errors.report(LoopError::UnhandledEffect {
                effect: format!("{effect:?}"),
            }),
            Resolution::Ambiguous(handlers) => errors.report(LoopError::AmbiguousEffect {
                effect: format!("{effect:?}"),
                handlers,
            }),
        };

        let handler = Arc::clone(&self.handler);
        let connected = Arc::clone(&self.connected);
        let dispose = move || {
            cancelled.store(true, Ordering::Release);
            handler.stop();
            connected.store(false, Ordering::Release);
            tracing::trace!("effect handler disconnected");
        };

        Connection::new(accept, dispose)
    }
}

impl<H: Debug> Debug for EffectHandlerConnectable<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectHandlerConnectable")
            .field("handler", &self.handler)
            .field("connected", &self.is_connected())
            .finish()
    }
}
