use std::fmt;

use crate::{AnyEffectHandler, EffectHandler, Emitter, Resolution, SuspendedHandler, VoidEffectHandler};

/// A collection of effect handlers with the same `Effect` and `Event` types
/// but arbitrary payload types.
///
/// At most one child may claim any particular effect. When several do, the
/// composite resolves the effect as [`Resolution::Ambiguous`] and none of them
/// runs; [`EffectHandlerConnectable`](crate::EffectHandlerConnectable) reports
/// that as a configuration error. The registry is built by value and becomes
/// immutable once it is handed to a connectable.
///
/// # Example
///
/// ```rust
/// use mobius_loop::{CompositeEffectHandler, Emitter, VoidEffectHandler};
///
/// #[derive(Debug, PartialEq, Eq, Hash)]
/// enum Effect { Refresh, Close }
/// enum Event { Refreshed }
///
/// struct Refresh;
/// impl VoidEffectHandler<Effect, Event> for Refresh {
///     fn matches(&self, effect: &Effect) -> bool { *effect == Effect::Refresh }
///     fn run(&self, emitter: &Emitter<Event>) { emitter.emit(Event::Refreshed) }
/// }
///
/// struct Close;
/// impl VoidEffectHandler<Effect, Event> for Close {
///     fn matches(&self, effect: &Effect) -> bool { *effect == Effect::Close }
///     fn run(&self, _emitter: &Emitter<Event>) {}
/// }
///
/// let handlers = CompositeEffectHandler::new()
///     .add_void_handler(Refresh)
///     .add_void_handler(Close);
/// assert_eq!(handlers.len(), 2);
/// ```
pub struct CompositeEffectHandler<Effect, Event> {
    children: Vec<AnyEffectHandler<Effect, Event>>,
}

impl<Effect, Event> Default for CompositeEffectHandler<Effect, Event> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Effect, Event> CompositeEffectHandler<Effect, Event> {
    pub fn new() -> Self {
        Self {
            children: Vec::new(),
        }
    }

    /// Add an already erased handler.
    pub fn add(mut self, handler: AnyEffectHandler<Effect, Event>) -> Self {
        self.children.push(handler);
        self
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl<Effect: 'static, Event: 'static> CompositeEffectHandler<Effect, Event> {
    pub fn add_handler<H>(self, handler: H) -> Self
    where
        H: EffectHandler<Effect, Event> + 'static,
    {
        self.add(AnyEffectHandler::new(handler))
    }

    pub fn add_void_handler<H>(self, handler: H) -> Self
    where
        H: VoidEffectHandler<Effect, Event> + 'static,
    {
        self.add(AnyEffectHandler::from_void(handler))
    }
}

impl<Effect, Event> EffectHandler<Effect, Event> for CompositeEffectHandler<Effect, Event>
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
        for child in &self.children {
            child.stop();
        }
    }

    fn resolve(&self, effect: &Effect) -> Resolution<SuspendedHandler<Event>> {
        let mut matched = Vec::new();
        let mut claimants = Vec::new();

        for child in &self.children {
            match child.resolve(effect) {
                Resolution::Matched(suspended) => {
                    claimants.push(suspended.identity());
                    matched.push(suspended);
                }
                Resolution::Unmatched => {}
                Resolution::Ambiguous(handlers) => claimants.extend(handlers),
            }
        }

        match (matched.pop(), claimants.len()) {
            (Some(suspended), 1) => Resolution::Matched(suspended),
            (None, 0) => Resolution::Unmatched,
            _ => Resolution::Ambiguous(claimants),
        }
    }
}

impl<Effect, Event> fmt::Debug for CompositeEffectHandler<Effect, Event> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeEffectHandler")
            .field("children", &self.children)
            .finish()
    }
}
