//! The effect handler protocol.

use crate::Emitter;

/// Outcome of offering an effect to a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<Payload> {
    /// Exactly one handler claims the effect.
    Matched(Payload),
    /// No handler claims the effect.
    Unmatched,
    /// Several handlers claim the effect; the names identify them.
    Ambiguous(Vec<&'static str>),
}

impl<Payload> Resolution<Payload> {
    pub fn map<T, F>(self, f: F) -> Resolution<T>
    where
        F: FnOnce(Payload) -> T,
    {
        match self {
            Resolution::Matched(payload) => Resolution::Matched(f(payload)),
            Resolution::Unmatched => Resolution::Unmatched,
            Resolution::Ambiguous(handlers) => Resolution::Ambiguous(handlers),
        }
    }

    pub fn matched(self) -> Option<Payload> {
        match self {
            Resolution::Matched(payload) => Some(payload),
            _ => None,
        }
    }
}

impl<Payload> From<Option<Payload>> for Resolution<Payload> {
    fn from(payload: Option<Payload>) -> Self {
        payload.map_or(Resolution::Unmatched, Resolution::Matched)
    }
}

/// Recognizes, executes and stops one kind of effect.
///
/// [`match_effect`](Self::match_effect) decides whether the handler claims an
/// effect and extracts the typed payload it needs. [`run`](Self::run) executes
/// it on the effect context; it may return immediately and keep working on
/// another thread, emitting events through a clone of the emitter whenever it
/// is done.
///
/// # Example
///
/// ```rust
/// use mobius_loop::{EffectHandler, Emitter};
///
/// #[derive(Debug, PartialEq, Eq, Hash)]
/// enum Effect { Fetch(u32), Save }
///
/// enum Event { Fetched(u32) }
///
/// struct FetchHandler;
///
/// impl EffectHandler<Effect, Event> for FetchHandler {
///     type Payload = u32;
///
///     fn match_effect(&self, effect: &Effect) -> Option<u32> {
///         match effect {
///             Effect::Fetch(id) => Some(*id),
///             _ => None,
///         }
///     }
///
///     fn run(&self, id: u32, emitter: &Emitter<Event>) {
///         emitter.emit(Event::Fetched(id));
///     }
/// }
/// ```
pub trait EffectHandler<Effect, Event>: Send + Sync {
    /// Data extracted from a claimed effect and handed to [`run`](Self::run).
    type Payload: Send + 'static;

    fn match_effect(&self, effect: &Effect) -> Option<Self::Payload>;

    fn run(&self, payload: Self::Payload, emitter: &Emitter<Event>);

    /// Release held resources (timers, sockets, threads).
    ///
    /// Called once when the owning loop is disposed. Must not panic. The
    /// emitters handed to [`run`](Self::run) are closed before this is called,
    /// so events emitted afterwards are dropped.
    fn stop(&self) {}

    /// Like [`match_effect`](Self::match_effect), but able to report that
    /// several nested handlers claim the effect.
    fn resolve(&self, effect: &Effect) -> Resolution<Self::Payload> {
        self.match_effect(effect).into()
    }
}

/// Effect handler for effects that carry no parameters.
///
/// Wrap one with [`AnyEffectHandler::from_void`](crate::AnyEffectHandler::from_void)
/// or add it with [`CompositeEffectHandler::add_void_handler`](crate::CompositeEffectHandler::add_void_handler).
pub trait VoidEffectHandler<Effect, Event>: Send + Sync {
    fn matches(&self, effect: &Effect) -> bool;

    fn run(&self, emitter: &Emitter<Event>);

    fn stop(&self) {}
}
