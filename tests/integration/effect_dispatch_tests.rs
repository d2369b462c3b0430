use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use mobius_loop::{
    Builder, CompositeEffectHandler, Connectable, EffectHandler, EffectHandlerConnectable, Emitter, ErrorRecorder,
    LoopError, TestExecutor, VoidEffectHandler,
};
use mockall::predicate::eq;
use spin::Mutex;

use super::{build_integration_test, update, MockBackend, TestEffect, TestEvent, TestModel};

#[derive(Clone, Default)]
struct Counters {
    runs: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
}

impl Counters {
    fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

struct Counting {
    claims: TestEffect,
    counters: Counters,
}

impl VoidEffectHandler<TestEffect, TestEvent> for Counting {
    fn matches(&self, effect: &TestEffect) -> bool {
        *effect == self.claims
    }

    fn run(&self, _emitter: &Emitter<TestEvent>) {
        self.counters.runs.fetch_add(1, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.counters.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Keeps the emitter it was run with so tests can emit after disposal.
struct Keeping {
    kept: Arc<Mutex<Option<Emitter<TestEvent>>>>,
}

impl EffectHandler<TestEffect, TestEvent> for Keeping {
    type Payload = ();

    fn match_effect(&self, effect: &TestEffect) -> Option<()> {
        (*effect == TestEffect::Announce).then_some(())
    }

    fn run(&self, _payload: (), emitter: &Emitter<TestEvent>) {
        *self.kept.lock() = Some(emitter.clone());
    }
}

#[test]
fn given_a_single_matching_handler_should_run_it_and_apply_its_event() {
    let mut backend = MockBackend::new();
    backend
        .expect_load()
        .with(eq(7))
        .times(1)
        .returning(|id| format!("item {id}"));
    backend.expect_announce().times(1).return_const(());

    let test = build_integration_test().given_backend(backend).build();
    test.dispatch(TestEvent::Fetch(7));

    assert_eq!(test.mobius_loop.most_recent_model(), "item 7".to_string());
    assert_eq!(test.errors.count(), 0);
}

#[test]
fn given_no_matching_handler_should_report_an_unhandled_effect() {
    let test = build_integration_test().build();

    test.dispatch(TestEvent::Misconfigured);

    assert_eq!(
        test.errors.errors(),
        vec![LoopError::UnhandledEffect {
            effect: "Unknown".to_string()
        }]
    );
    assert_eq!(test.mobius_loop.most_recent_model(), "begin".to_string());
}

#[test]
fn given_two_matching_handlers_should_report_once_and_run_neither() {
    let errors = ErrorRecorder::new();
    let first = Counters::default();
    let second = Counters::default();
    let handlers = CompositeEffectHandler::new()
        .add_void_handler(Counting {
            claims: TestEffect::Announce,
            counters: first.clone(),
        })
        .add_void_handler(Counting {
            claims: TestEffect::Announce,
            counters: second.clone(),
        });
    let connectable = EffectHandlerConnectable::new(handlers, errors.handler());
    let (sender, _receiver) = flume::unbounded();

    let connection = connectable.connect(Emitter::new(sender));
    connection.accept(TestEffect::Announce);

    let reported = errors.errors();
    assert_eq!(reported.len(), 1);
    match &reported[0] {
        LoopError::AmbiguousEffect { effect, handlers } => {
            assert_eq!(effect, "Announce");
            assert_eq!(handlers.len(), 2);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(first.runs() + second.runs(), 0);
}

#[test]
fn given_an_ambiguous_nested_composite_should_report_once() {
    let errors = ErrorRecorder::new();
    let counters = Counters::default();
    let nested = CompositeEffectHandler::new()
        .add_void_handler(Counting {
            claims: TestEffect::Announce,
            counters: counters.clone(),
        })
        .add_void_handler(Counting {
            claims: TestEffect::Announce,
            counters: counters.clone(),
        });
    let handlers = CompositeEffectHandler::new()
        .add_handler(nested)
        .add_void_handler(Counting {
            claims: TestEffect::Unknown,
            counters: counters.clone(),
        });
    let connection =
        EffectHandlerConnectable::new(handlers, errors.handler()).connect(Emitter::new(flume::unbounded().0));

    connection.accept(TestEffect::Announce);
    connection.accept(TestEffect::Unknown);

    assert_eq!(errors.count(), 1);
    assert!(matches!(errors.errors()[0], LoopError::AmbiguousEffect { .. }));
    assert_eq!(counters.runs(), 1);
}

#[test]
fn given_duplicate_effects_in_one_transition_should_run_each_once() {
    let executor = TestExecutor::new();
    let errors = ErrorRecorder::new();
    let announce = Counters::default();
    let load = Counters::default();
    let handlers = CompositeEffectHandler::new()
        .add_void_handler(Counting {
            claims: TestEffect::Announce,
            counters: announce.clone(),
        })
        .add_void_handler(Counting {
            claims: TestEffect::Load(1),
            counters: load.clone(),
        });

    let _mobius_loop = Builder::new(update, EffectHandlerConnectable::new(handlers, errors.handler()))
        .with_initiator(|_model: &mut TestModel| {
            vec![TestEffect::Announce, TestEffect::Announce, TestEffect::Load(1)]
        })
        .with_event_spawner(executor.clone())
        .with_effect_spawner(executor.clone())
        .with_error_handler(errors.handler())
        .start("begin".to_string());
    executor.run_until_stalled();

    assert_eq!(announce.runs(), 1);
    assert_eq!(load.runs(), 1);
    assert_eq!(errors.count(), 0);
}

#[test]
fn given_a_connected_handler_when_connected_again_should_report_and_return_a_broken_connection() {
    let errors = ErrorRecorder::new();
    let counters = Counters::default();
    let connectable = EffectHandlerConnectable::new(
        CompositeEffectHandler::new().add_void_handler(Counting {
            claims: TestEffect::Announce,
            counters: counters.clone(),
        }),
        errors.handler(),
    );

    let first = connectable.connect(Emitter::new(flume::unbounded().0));
    let second = connectable.connect(Emitter::new(flume::unbounded().0));
    second.accept(TestEffect::Announce);

    assert_eq!(errors.errors(), vec![LoopError::AlreadyConnected]);
    assert_eq!(counters.runs(), 0);

    first.accept(TestEffect::Announce);
    assert_eq!(counters.runs(), 1);

    first.dispose();
    assert!(!connectable.is_connected());
    let third = connectable.connect(Emitter::new(flume::unbounded().0));
    third.accept(TestEffect::Announce);
    assert_eq!(counters.runs(), 2);
    assert_eq!(errors.count(), 1);
}

#[test]
fn given_a_disposed_connection_should_stop_handlers_once_and_ignore_effects() {
    let errors = ErrorRecorder::new();
    let counters = Counters::default();
    let connectable = EffectHandlerConnectable::new(
        CompositeEffectHandler::new().add_void_handler(Counting {
            claims: TestEffect::Announce,
            counters: counters.clone(),
        }),
        errors.handler(),
    );
    let connection = connectable.connect(Emitter::new(flume::unbounded().0));

    connection.dispose();
    connection.dispose();
    connection.accept(TestEffect::Announce);

    assert_eq!(counters.stops(), 1);
    assert_eq!(counters.runs(), 0);
    assert!(connection.is_disposed());
    assert_eq!(errors.count(), 0);
}

#[test]
fn given_a_disposed_connection_should_close_emitters_handed_to_handlers() {
    let errors = ErrorRecorder::new();
    let kept = Arc::new(Mutex::new(None));
    let connectable = EffectHandlerConnectable::new(
        Keeping {
            kept: Arc::clone(&kept),
        },
        errors.handler(),
    );
    let (sender, receiver) = flume::unbounded();
    let connection = connectable.connect(Emitter::new(sender));

    connection.accept(TestEffect::Announce);
    let emitter = kept.lock().clone().expect("handler should have run");
    emitter.emit(TestEvent::Append("before"));
    connection.dispose();
    emitter.emit(TestEvent::Append("after"));

    assert!(emitter.is_closed());
    assert_eq!(receiver.try_iter().collect::<Vec<_>>(), vec![TestEvent::Append("before")]);
}

#[test]
fn given_a_loop_when_disposed_should_stop_its_effect_handlers() {
    let executor = TestExecutor::new();
    let errors = ErrorRecorder::new();
    let counters = Counters::default();
    let handlers = CompositeEffectHandler::new().add_void_handler(Counting {
        claims: TestEffect::Announce,
        counters: counters.clone(),
    });

    let mobius_loop = Builder::new(update, EffectHandlerConnectable::new(handlers, errors.handler()))
        .with_event_spawner(executor.clone())
        .with_effect_spawner(executor.clone())
        .with_error_handler(errors.handler())
        .start("begin".to_string());
    mobius_loop.dispose();
    drop(mobius_loop);

    assert_eq!(counters.stops(), 1);
}
