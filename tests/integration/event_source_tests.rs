use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mobius_loop::{Builder, Emitter, ErrorRecorder, RecordingConnectable, Subscription, TestExecutor};
use spin::Mutex;

use super::{build_integration_test, update, TestEvent};

#[test]
fn given_a_source_emitting_on_subscribe_should_apply_its_events_after_init() {
    let test = build_integration_test()
        .given_model("the beginning")
        .given_source_events(vec![
            TestEvent::Append("-one"),
            TestEvent::Append("-two"),
            TestEvent::Append("-three"),
        ])
        .build();

    assert_eq!(test.models.models(), vec!["the beginning".to_string()]);

    test.settle();

    assert_eq!(
        test.models.models(),
        vec![
            "the beginning".to_string(),
            "the beginning-one".to_string(),
            "the beginning-one-two".to_string(),
            "the beginning-one-two-three".to_string(),
        ]
    );
}

#[test]
fn given_a_running_loop_should_apply_events_the_source_emits_later() {
    let executor = TestExecutor::new();
    let errors = ErrorRecorder::new();
    let source_emitter: Arc<Mutex<Option<Emitter<TestEvent>>>> = Arc::new(Mutex::new(None));
    let subscribed = Arc::new(AtomicBool::new(true));

    let source = {
        let source_emitter = Arc::clone(&source_emitter);
        let subscribed = Arc::clone(&subscribed);
        move |emitter: Emitter<TestEvent>| {
            *source_emitter.lock() = Some(emitter);
            let subscribed = Arc::clone(&subscribed);
            Subscription::new(move || subscribed.store(false, Ordering::SeqCst))
        }
    };

    let mobius_loop = Builder::new(update, RecordingConnectable::new())
        .with_event_source(source)
        .with_event_spawner(executor.clone())
        .with_effect_spawner(executor.clone())
        .with_error_handler(errors.handler())
        .start("from".to_string());
    let emitter = source_emitter.lock().clone().expect("source should be subscribed");

    emitter.emit(TestEvent::Append(" source"));
    executor.run_until_stalled();
    assert_eq!(mobius_loop.most_recent_model(), "from source".to_string());

    mobius_loop.dispose();

    assert!(!subscribed.load(Ordering::SeqCst));
    assert!(emitter.is_closed());
    emitter.emit(TestEvent::Append(" ignored"));
    executor.run_until_stalled();
    assert_eq!(mobius_loop.most_recent_model(), "from source".to_string());
    assert_eq!(errors.count(), 0);
}
