//! Event emitter handed to effect handlers and event sources.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use flume::Sender;

/// Sends events back into a running loop.
///
/// Effect handlers receive an `Emitter` in [`EffectHandler::run`](crate::EffectHandler::run)
/// and event sources receive one on subscription. Clone it freely to move it
/// into threads, timers or futures that complete later.
///
/// `Emitter` wraps a lock-free channel sender, making it cheap to clone
/// and thread-safe without any locking overhead.
///
/// # Example
///
/// ```rust
/// use mobius_loop::Emitter;
///
/// let (sender, receiver) = flume::unbounded();
/// let emitter = Emitter::new(sender);
///
/// let background = emitter.clone();
/// std::thread::spawn(move || background.emit("loaded")).join().unwrap();
///
/// assert_eq!(receiver.try_recv(), Ok("loaded"));
/// ```
pub struct Emitter<Event> {
    sender: Sender<Event>,
    gates: Vec<Arc<AtomicBool>>,
}

impl<Event> Clone for Emitter<Event> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            gates: self.gates.clone(),
        }
    }
}

impl<Event> Emitter<Event> {
    /// Create a new emitter from a channel sender.
    pub fn new(sender: Sender<Event>) -> Self {
        Self {
            sender,
            gates: Vec::new(),
        }
    }

    /// An emitter that stops delivering once `closed` is set.
    pub(crate) fn gated(&self, closed: Arc<AtomicBool>) -> Self {
        let mut gated = self.clone();
        gated.gates.push(closed);
        gated
    }

    /// Emit an event.
    ///
    /// This queues the event for processing by the loop. Multiple threads
    /// can safely call this method concurrently via the lock-free channel.
    /// Events emitted after the loop or the owning connection has been
    /// disposed are dropped.
    pub fn emit(&self, event: Event) {
        if self.is_closed() {
            return;
        }
        self.sender.send(event).ok();
    }

    /// Whether events emitted now would be dropped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_disconnected() || self.gates.iter().any(|gate| gate.load(Ordering::Acquire))
    }
}
