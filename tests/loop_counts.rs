//! Loop iteration and run accounting through the public runner API.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use memtools::runner::{ActionRegistry, LoopConfig, RepeatRunner, WorkDescriptor};

fn counting_actions(calls: &Arc<AtomicUsize>) -> Arc<ActionRegistry> {
    let mut actions = ActionRegistry::new();
    let counter = Arc::clone(calls);
    actions.register("bench:tick", move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    Arc::new(actions)
}

#[test]
fn test_count_times_concurrency_runs() {
    let calls = Arc::new(AtomicUsize::new(0));
    let runner = RepeatRunner::new(
        WorkDescriptor::parse("bench:tick"),
        LoopConfig::new(0.01, Some(3), 2).unwrap(),
        counting_actions(&calls),
    );

    let mut out = Vec::new();
    let report = runner.run(&AtomicBool::new(false), None, &mut out).unwrap();

    assert_eq!(report.iterations, 3);
    assert_eq!(report.runs(), 6);
    assert!(!report.interrupted);
    assert_eq!(calls.load(Ordering::SeqCst), 6);

    let out = String::from_utf8(out).unwrap();
    assert!(out.starts_with("\nLooped 3 times in "));
    assert!(out.contains(" with concurrency of 2 (6 runs, "));
    assert!(out.ends_with(" secs per run)\n"));
}

#[test]
fn test_failures_do_not_stop_the_loop() {
    let runner = RepeatRunner::new(
        WorkDescriptor::parse("bench:missing"),
        LoopConfig::new(0.01, Some(2), 1).unwrap(),
        Arc::new(ActionRegistry::new()),
    );

    let mut out = Vec::new();
    let report = runner.run(&AtomicBool::new(false), None, &mut out).unwrap();

    assert_eq!(report.iterations, 2);
    let out = String::from_utf8(out).unwrap();
    assert_eq!(out.matches("No action registered as \"bench:missing\"").count(), 2);
    assert!(out.contains("Looped 2 times in "));
    assert!(!out.contains("concurrency"));
}

#[test]
fn test_invalid_arguments_are_rejected() {
    assert!(LoopConfig::new(1.0, Some(1), 0).is_err());
    assert!(LoopConfig::new(1.0, Some(0), 1).is_err());
    assert!(LoopConfig::new(0.0, None, 1).is_err());
    assert!(LoopConfig::new(-2.0, None, 1).is_err());
}
