mod simple_logic;

use std::sync::Arc;

use mobius_loop::{
    Builder, CompositeEffectHandler, EffectHandlerConnectable, Emitter, ErrorRecorder, MobiusLoop, ModelRecorder,
    Subscription, TestExecutor,
};
pub(crate) use simple_logic::*;

mod effect_dispatch_tests;
mod event_source_tests;

pub(crate) struct IntegrationTest {
    pub(crate) mobius_loop: MobiusLoop<TestModel, TestEvent, TestEffect>,
    pub(crate) executor: TestExecutor,
    pub(crate) models: ModelRecorder<TestModel>,
    pub(crate) errors: ErrorRecorder,
    pub(crate) observer: Subscription,
}

impl IntegrationTest {
    /// Dispatch `event` and run both contexts until nothing is left to do.
    pub(crate) fn dispatch(&self, event: TestEvent) {
        self.mobius_loop.dispatch_event(event);
        self.settle();
    }

    pub(crate) fn settle(&self) {
        self.executor.run_until_stalled();
    }
}

pub(crate) struct IntegrationTestBuilder {
    initial_model: TestModel,
    initial_effects: Vec<TestEffect>,
    source_events: Vec<TestEvent>,
    backend: MockBackend,
}

pub(crate) fn build_integration_test() -> IntegrationTestBuilder {
    IntegrationTestBuilder {
        initial_model: "begin".to_string(),
        initial_effects: Vec::new(),
        source_events: Vec::new(),
        backend: MockBackend::new(),
    }
}

impl IntegrationTestBuilder {
    pub(crate) fn given_model(mut self, model: &str) -> Self {
        self.initial_model = model.to_string();
        self
    }

    pub(crate) fn given_initial_effects(mut self, effects: Vec<TestEffect>) -> Self {
        self.initial_effects = effects;
        self
    }

    /// Events the event source emits as soon as it is subscribed.
    pub(crate) fn given_source_events(mut self, events: Vec<TestEvent>) -> Self {
        self.source_events = events;
        self
    }

    pub(crate) fn given_backend(mut self, backend: MockBackend) -> Self {
        self.backend = backend;
        self
    }

    pub(crate) fn build(self) -> IntegrationTest {
        let executor = TestExecutor::new();
        let errors = ErrorRecorder::new();

        let mut backend = self.backend;
        backend.expect_release().return_const(());
        let backend: Arc<dyn Backend + Send + Sync> = Arc::new(backend);

        let handlers = CompositeEffectHandler::new()
            .add_handler(LoadHandler {
                backend: Arc::clone(&backend),
            })
            .add_void_handler(AnnounceHandler { backend });

        let initial_effects = self.initial_effects;
        let source_events = self.source_events;

        let mobius_loop = Builder::new(update, EffectHandlerConnectable::new(handlers, errors.handler()))
            .with_initiator(move |_model: &mut TestModel| initial_effects.clone())
            .with_event_source(move |emitter: Emitter<TestEvent>| {
                for event in source_events.iter().cloned() {
                    emitter.emit(event);
                }
                Subscription::empty()
            })
            .with_event_spawner(executor.clone())
            .with_effect_spawner(executor.clone())
            .with_error_handler(errors.handler())
            .start(self.initial_model);

        let models = ModelRecorder::new();
        let observer = mobius_loop.add_observer(models.observer());

        IntegrationTest {
            mobius_loop,
            executor,
            models,
            errors,
            observer,
        }
    }
}
