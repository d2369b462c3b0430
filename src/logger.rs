//! Observation hooks around the initiate and update functions.

use std::fmt::Debug;
use std::sync::Arc;

use crate::{Initiate, Update};

/// Hooks called before and after every initiate and update call.
///
/// Each hook runs on the event context, inline with the function it wraps:
/// a hook that blocks stalls every later event. Hooks only observe; they
/// cannot change the model or the effects. Every method defaults to a no-op.
///
/// # Example
///
/// ```rust
/// use mobius_loop::Logger;
///
/// struct PrintingLogger;
///
/// impl Logger<u32, &'static str, String> for PrintingLogger {
///     fn did_update(&self, input: &u32, event: &&'static str, output: &u32, effects: &[String]) {
///         println!("{input} --{event}--> {output} {effects:?}");
///     }
/// }
/// ```
pub trait Logger<Model, Event, Effect>: Send + Sync {
    /// Called right before the initiator with the model it will receive.
    fn will_initiate(&self, _model: &Model) {}

    /// Called right after the initiator with its input, its output and the
    /// effects it returned.
    fn did_initiate(&self, _start_model: &Model, _initiated_model: &Model, _effects: &[Effect]) {}

    /// Called right before the update function with the model and event it will receive.
    fn will_update(&self, _model: &Model, _event: &Event) {}

    /// Called right after the update function with its input model, the event,
    /// its output model and the effects it returned.
    fn did_update(&self, _input_model: &Model, _event: &Event, _output_model: &Model, _effects: &[Effect]) {}
}

/// Logger that writes every hook as a `tracing` event.
///
/// Start and initiation are logged at `info`, events and model changes at
/// `debug`, and every returned effect at `debug`. The tag is attached to each
/// event as the `loop_tag` field so several loops can share one subscriber.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    tag: String,
}

impl TracingLogger {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self::new("Mobius")
    }
}

impl<Model, Event, Effect> Logger<Model, Event, Effect> for TracingLogger
where
    Model: Debug,
    Event: Debug,
    Effect: Debug,
{
    fn will_initiate(&self, _model: &Model) {
        tracing::info!(loop_tag = %self.tag, "initializing loop");
    }

    fn did_initiate(&self, _start_model: &Model, initiated_model: &Model, effects: &[Effect]) {
        tracing::info!(loop_tag = %self.tag, model = ?initiated_model, "loop initialized");
        for effect in effects {
            tracing::debug!(loop_tag = %self.tag, ?effect, "effect dispatched");
        }
    }

    fn will_update(&self, _model: &Model, event: &Event) {
        tracing::debug!(loop_tag = %self.tag, ?event, "event received");
    }

    fn did_update(&self, _input_model: &Model, _event: &Event, output_model: &Model, effects: &[Effect]) {
        tracing::debug!(loop_tag = %self.tag, model = ?output_model, "model updated");
        for effect in effects {
            tracing::debug!(loop_tag = %self.tag, ?effect, "effect dispatched");
        }
    }
}

/// Initiator wrapped with [`Logger::will_initiate`] and [`Logger::did_initiate`].
pub(crate) struct LoggingInitiator<Model, Event, Effect> {
    initiate: Arc<dyn Initiate<Model, Effect>>,
    logger: Arc<dyn Logger<Model, Event, Effect>>,
}

impl<Model, Event, Effect> LoggingInitiator<Model, Event, Effect> {
    pub(crate) fn new(
        initiate: Arc<dyn Initiate<Model, Effect>>,
        logger: Arc<dyn Logger<Model, Event, Effect>>,
    ) -> Self {
        Self { initiate, logger }
    }
}

impl<Model, Event, Effect> Initiate<Model, Effect> for LoggingInitiator<Model, Event, Effect>
where
    Model: Clone,
{
    fn initiate(&self, model: &mut Model) -> Vec<Effect> {
        let start_model = model.clone();

        self.logger.will_initiate(&start_model);
        let effects = self.initiate.initiate(model);
        self.logger.did_initiate(&start_model, model, &effects);

        effects
    }
}

/// Update function wrapped with [`Logger::will_update`] and [`Logger::did_update`].
pub(crate) struct LoggingUpdate<Model, Event, Effect> {
    update: Arc<dyn Update<Model, Event, Effect>>,
    logger: Arc<dyn Logger<Model, Event, Effect>>,
}

impl<Model, Event, Effect> LoggingUpdate<Model, Event, Effect> {
    pub(crate) fn new(
        update: Arc<dyn Update<Model, Event, Effect>>,
        logger: Arc<dyn Logger<Model, Event, Effect>>,
    ) -> Self {
        Self { update, logger }
    }
}

impl<Model, Event, Effect> Update<Model, Event, Effect> for LoggingUpdate<Model, Event, Effect>
where
    Model: Clone,
    Event: Clone,
{
    fn update(&self, model: &mut Model, event: Event) -> Vec<Effect> {
        let input_model = model.clone();
        let logged_event = event.clone();

        self.logger.will_update(&input_model, &logged_event);
        let effects = self.update.update(model, event);
        self.logger.did_update(&input_model, &logged_event, model, &effects);

        effects
    }
}
