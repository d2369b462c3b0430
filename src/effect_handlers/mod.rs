//! Composition of effect handlers behind one connectable.

mod any;
mod composite;
mod connectable;

pub use any::{AnyEffectHandler, SuspendedHandler};
pub use composite::CompositeEffectHandler;
pub use connectable::EffectHandlerConnectable;
