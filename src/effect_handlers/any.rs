use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use crate::{EffectHandler, Emitter, Resolution, VoidEffectHandler};

type Resolver<Effect, Event> =
    Box<dyn Fn(&Effect) -> Resolution<SuspendedHandler<Event>> + Send + Sync>;

/// An [`EffectHandler`] with its payload type erased.
///
/// Handlers with different payload types become the same type once wrapped,
/// which is what lets [`CompositeEffectHandler`](crate::CompositeEffectHandler)
/// hold them side by side. The payload of an `AnyEffectHandler` is a
/// [`SuspendedHandler`]: the original handler bound to the payload it extracted.
pub struct AnyEffectHandler<Effect, Event> {
    identity: &'static str,
    resolver: Resolver<Effect, Event>,
    stopper: Box<dyn Fn() + Send + Sync>,
}

impl<Effect: 'static, Event: 'static> AnyEffectHandler<Effect, Event> {
    pub fn new<H>(handler: H) -> Self
    where
        H: EffectHandler<Effect, Event> + 'static,
    {
        let identity = type_name::<H>();
        let handler = Arc::new(handler);
        let resolving = Arc::clone(&handler);

        Self {
            identity,
            resolver: Box::new(move |effect| {
                resolving.resolve(effect).map(|payload| {
                    let running = Arc::clone(&resolving);
                    SuspendedHandler::new(identity, move |emitter| running.run(payload, emitter))
                })
            }),
            stopper: Box::new(move || handler.stop()),
        }
    }

    pub fn from_void<H>(handler: H) -> Self
    where
        H: VoidEffectHandler<Effect, Event> + 'static,
    {
        let identity = type_name::<H>();
        let handler = Arc::new(handler);
        let resolving = Arc::clone(&handler);

        Self {
            identity,
            resolver: Box::new(move |effect| {
                if !resolving.matches(effect) {
                    return Resolution::Unmatched;
                }
                let running = Arc::clone(&resolving);
                Resolution::Matched(SuspendedHandler::new(identity, move |emitter| {
                    running.run(emitter)
                }))
            }),
            stopper: Box::new(move || handler.stop()),
        }
    }
}

impl<Effect, Event> AnyEffectHandler<Effect, Event> {
    /// Type name of the wrapped handler.
    pub fn identity(&self) -> &'static str {
        self.identity
    }
}

impl<Effect, Event> EffectHandler<Effect, Event> for AnyEffectHandler<Effect, Event>
where
    Event: 'static,
{
    type Payload = SuspendedHandler<Event>;

    fn match_effect(&self, effect: &Effect) -> Option<SuspendedHandler<Event>> {
        self.resolve(effect).matched()
    }

    fn run(&self, suspended: SuspendedHandler<Event>, emitter: &Emitter<Event>) {
        suspended.run(emitter);
    }

    fn stop(&self) {
        (self.stopper)();
    }

    fn resolve(&self, effect: &Effect) -> Resolution<SuspendedHandler<Event>> {
        (self.resolver)(effect)
    }
}

impl<Effect, Event> fmt::Debug for AnyEffectHandler<Effect, Event> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyEffectHandler")
            .field("handler", &self.identity)
            .finish()
    }
}

/// A handler whose match has passed, bound to its payload.
///
/// Running it consumes it.
pub struct SuspendedHandler<Event> {
    identity: &'static str,
    run: Box<dyn FnOnce(&Emitter<Event>) + Send>,
}

impl<Event> SuspendedHandler<Event> {
    fn new<F>(identity: &'static str, run: F) -> Self
    where
        F: FnOnce(&Emitter<Event>) + Send + 'static,
    {
        Self {
            identity,
            run: Box::new(run),
        }
    }

    /// Type name of the handler that matched.
    pub fn identity(&self) -> &'static str {
        self.identity
    }

    pub fn run(self, emitter: &Emitter<Event>) {
        (self.run)(emitter);
    }
}

impl<Event> fmt::Debug for SuspendedHandler<Event> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuspendedHandler")
            .field("handler", &self.identity)
            .finish()
    }
}
