use std::sync::Arc;

use mobius_loop::{EffectHandler, Emitter, VoidEffectHandler};

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum TestEvent {
    Append(&'static str),
    Fetch(u32),
    Fetched(String),
    Misconfigured,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum TestEffect {
    Load(u32),
    Announce,
    Unknown,
}

pub(crate) type TestModel = String;

pub(crate) fn update(model: &mut TestModel, event: TestEvent) -> Vec<TestEffect> {
    match event {
        TestEvent::Append(text) => {
            model.push_str(text);
            Vec::new()
        }
        TestEvent::Fetch(id) => vec![TestEffect::Load(id)],
        TestEvent::Fetched(value) => {
            *model = value;
            vec![TestEffect::Announce]
        }
        TestEvent::Misconfigured => vec![TestEffect::Unknown],
    }
}

#[cfg_attr(test, mockall::automock)]
pub(crate) trait Backend {
    fn load(&self, id: u32) -> String;
    fn announce(&self);
    fn release(&self);
}

pub(crate) struct LoadHandler {
    pub(crate) backend: Arc<dyn Backend + Send + Sync>,
}

impl EffectHandler<TestEffect, TestEvent> for LoadHandler {
    type Payload = u32;

    fn match_effect(&self, effect: &TestEffect) -> Option<u32> {
        match effect {
            TestEffect::Load(id) => Some(*id),
            _ => None,
        }
    }

    fn run(&self, id: u32, emitter: &Emitter<TestEvent>) {
        emitter.emit(TestEvent::Fetched(self.backend.load(id)));
    }

    fn stop(&self) {
        self.backend.release();
    }
}

pub(crate) struct AnnounceHandler {
    pub(crate) backend: Arc<dyn Backend + Send + Sync>,
}

impl VoidEffectHandler<TestEffect, TestEvent> for AnnounceHandler {
    fn matches(&self, effect: &TestEffect) -> bool {
        *effect == TestEffect::Announce
    }

    fn run(&self, _emitter: &Emitter<TestEvent>) {
        self.backend.announce();
    }
}
