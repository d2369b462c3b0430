//! A unidirectional data-flow loop runtime.
//!
//! A loop owns a model and a pure update function. Events are applied one at
//! a time on an event context; each transition yields the next model, which
//! is published to observers, and a list of effects, which are handed to
//! effect handlers on an effect context. Effect handlers feed their results
//! back into the loop as events.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::mpsc;
//! use mobius_loop::{Builder, CompositeEffectHandler, EffectHandler, EffectHandlerConnectable, Emitter, ErrorHandler};
//!
//! #[derive(Clone, Debug, PartialEq)]
//! enum Event { Load, Loaded(u32) }
//!
//! #[derive(Debug, PartialEq, Eq, Hash)]
//! enum Effect { Fetch }
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct Model { loading: bool, value: Option<u32> }
//!
//! fn update(model: &mut Model, event: Event) -> Vec<Effect> {
//!     match event {
//!         Event::Load => {
//!             model.loading = true;
//!             vec![Effect::Fetch]
//!         }
//!         Event::Loaded(value) => {
//!             model.loading = false;
//!             model.value = Some(value);
//!             Vec::new()
//!         }
//!     }
//! }
//!
//! struct Fetcher;
//!
//! impl EffectHandler<Effect, Event> for Fetcher {
//!     type Payload = ();
//!
//!     fn match_effect(&self, effect: &Effect) -> Option<()> {
//!         matches!(effect, Effect::Fetch).then_some(())
//!     }
//!
//!     fn run(&self, _payload: (), emitter: &Emitter<Event>) {
//!         emitter.emit(Event::Loaded(42));
//!     }
//! }
//!
//! let handlers = CompositeEffectHandler::new().add_handler(Fetcher);
//! let mobius_loop = Builder::new(update, EffectHandlerConnectable::new(handlers, ErrorHandler::default()))
//!     .start(Model { loading: false, value: None });
//!
//! let (sender, models) = mpsc::channel();
//! let _observer = mobius_loop.add_observer(move |model| {
//!     sender.send(model).ok();
//! });
//! mobius_loop.dispatch_event(Event::Load);
//!
//! let loaded = models.iter().find(|model| model.value.is_some());
//! assert_eq!(loaded, Some(Model { loading: false, value: Some(42) }));
//!
//! mobius_loop.dispose();
//! ```
//!
//! ## Testing
//!
//! With the `testing` feature, [`TestExecutor`] runs both contexts under the
//! test's control, [`ModelRecorder`] and [`ErrorRecorder`] capture what a loop
//! publishes and reports, and [`UpdateSpec`] / [`InitSpec`] exercise update
//! and initiation functions without a loop.

// Module declarations
mod builder;
mod connection;
mod effect;
mod effect_handlers;
mod emitter;
mod error;
mod event_source;
mod logger;
mod logic;
mod processor;
mod publisher;
mod runtime;

// Public re-exports
pub use builder::Builder;
pub use connection::{Connectable, Connection, Subscription};
pub use effect::{EffectHandler, Resolution, VoidEffectHandler};
pub use effect_handlers::{AnyEffectHandler, CompositeEffectHandler, EffectHandlerConnectable, SuspendedHandler};
pub use emitter::Emitter;
pub use error::{ErrorHandler, LoopError};
pub use event_source::{EventSource, NoEventSource};
pub use logger::{Logger, TracingLogger};
pub use logic::{First, Initiate, Next, Update};
pub use processor::EventProcessor;
pub use publisher::ModelPublisher;
pub use runtime::{MobiusLoop, Spawner, ThreadSpawner};

// Test utilities (only available with 'testing' feature or during tests)
#[cfg(any(test, feature = "testing"))]
pub use connection::RecordingConnectable;
#[cfg(any(test, feature = "testing"))]
pub use error::ErrorRecorder;
#[cfg(any(test, feature = "testing"))]
pub use logic::{InitSpec, InitWhen, UpdateGiven, UpdateResult, UpdateSpec, UpdateWhen};
#[cfg(any(test, feature = "testing"))]
pub use publisher::ModelRecorder;
#[cfg(any(test, feature = "testing"))]
pub use runtime::{ImmediateSpawner, TestExecutor};
