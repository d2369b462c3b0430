//! External producers of events.

use crate::{Emitter, Subscription};

/// A source of events outside the loop (timers, sockets, notifications).
///
/// The loop subscribes once when it starts and disposes the returned
/// [`Subscription`] when it is disposed.
///
/// Closures with the signature `Fn(Emitter<Event>) -> Subscription`
/// implement this trait via the blanket implementation.
///
/// # Example
///
/// ```rust
/// use mobius_loop::{Emitter, EventSource, Subscription};
///
/// let source = |emitter: Emitter<&'static str>| {
///     emitter.emit("connected");
///     Subscription::empty()
/// };
///
/// let (sender, receiver) = flume::unbounded();
/// let subscription = source.subscribe(Emitter::new(sender));
/// subscription.dispose();
///
/// assert_eq!(receiver.try_recv(), Ok("connected"));
/// ```
pub trait EventSource<Event>: Send + Sync {
    fn subscribe(&self, emitter: Emitter<Event>) -> Subscription;
}

impl<Event, F> EventSource<Event> for F
where
    F: Fn(Emitter<Event>) -> Subscription + Send + Sync,
{
    fn subscribe(&self, emitter: Emitter<Event>) -> Subscription {
        self(emitter)
    }
}

/// Event source that never produces events. Used when none is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEventSource;

impl<Event> EventSource<Event> for NoEventSource {
    fn subscribe(&self, _emitter: Emitter<Event>) -> Subscription {
        Subscription::empty()
    }
}
