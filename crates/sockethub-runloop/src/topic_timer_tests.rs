use super::*;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::RunLoopError;

fn registry() -> (Arc<RunLoop>, TopicPeriodicTimer) {
    registry_with(TopicTimerOptions::default())
}

fn registry_with(options: TopicTimerOptions) -> (Arc<RunLoop>, TopicPeriodicTimer) {
    let run_loop = Arc::new(RunLoop::default());
    let timers = TopicPeriodicTimer::new(run_loop.clone(), options);
    (run_loop, timers)
}

fn counting(counter: &Arc<AtomicU32>) -> impl Fn() + Send + Sync + 'static {
    let counter = counter.clone();
    move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_add_makes_timer_active() {
    let (_run_loop, timers) = registry();
    assert!(!timers.is_registered("chat/room"));

    timers
        .add_periodic_timer("chat/room", "ping", Duration::from_secs(1), || {})
        .unwrap();

    assert!(timers.is_registered("chat/room"));
    assert!(timers.is_periodic_timer_active("chat/room", "ping"));
    assert!(!timers.is_periodic_timer_active("chat/room", "other"));
    assert!(!timers.is_periodic_timer_active("other", "ping"));
}

#[test]
fn test_zero_interval_is_rejected_without_registering() {
    let (run_loop, timers) = registry();

    let result = timers.add_periodic_timer("t", "n", Duration::ZERO, || {});
    assert!(matches!(result, Err(RunLoopError::InvalidInterval(_))));
    assert!(!timers.is_registered("t"));
    assert_eq!(run_loop.timer_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_timer_never_fires() {
    let (run_loop, timers) = registry();
    let count = Arc::new(AtomicU32::new(0));

    timers
        .add_periodic_timer("t", "n", Duration::from_secs(1), counting(&count))
        .unwrap();
    run_loop.run_for(Duration::from_millis(1500)).await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);

    timers.cancel_periodic_timer("t", "n");
    assert!(!timers.is_periodic_timer_active("t", "n"));

    run_loop.run_for(Duration::from_secs(10)).await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_cancel_is_idempotent() {
    let (_run_loop, timers) = registry();

    timers.cancel_periodic_timer("missing", "n");
    timers
        .add_periodic_timer("t", "n", Duration::from_secs(1), || {})
        .unwrap();
    timers.cancel_periodic_timer("t", "n");
    timers.cancel_periodic_timer("t", "n");
    assert!(!timers.is_periodic_timer_active("t", "n"));
}

#[tokio::test(start_paused = true)]
async fn test_replacing_cancels_previous_handle() {
    let (run_loop, timers) = registry();
    let old = Arc::new(AtomicU32::new(0));
    let new = Arc::new(AtomicU32::new(0));

    let first = timers
        .add_periodic_timer("t", "n", Duration::from_secs(1), counting(&old))
        .unwrap();
    let second = timers
        .add_periodic_timer("t", "n", Duration::from_secs(2), counting(&new))
        .unwrap();

    assert_ne!(first, second);
    assert!(!run_loop.is_timer_active(first));
    assert_eq!(run_loop.timer_count(), 1);
    assert_eq!(timers.periodic_timers("t"), vec![("n".to_string(), second)]);

    run_loop.run_for(Duration::from_millis(4500)).await.unwrap();
    assert_eq!(old.load(Ordering::SeqCst), 0);
    assert_eq!(new.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_clear_cancels_all_timers_by_default() {
    let (run_loop, timers) = registry();
    let count = Arc::new(AtomicU32::new(0));

    for name in ["a", "b", "c"] {
        timers
            .add_periodic_timer("t", name, Duration::from_secs(1), counting(&count))
            .unwrap();
    }
    timers
        .add_periodic_timer("other", "a", Duration::from_secs(1), || {})
        .unwrap();

    timers.clear_periodic_timer("t");

    assert!(!timers.is_registered("t"));
    for name in ["a", "b", "c"] {
        assert!(!timers.is_periodic_timer_active("t", name));
    }
    assert!(timers.is_periodic_timer_active("other", "a"));

    run_loop.run_for(Duration::from_secs(5)).await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_clear_without_cancel_leaves_callbacks_running() {
    let (run_loop, timers) = registry_with(TopicTimerOptions {
        cancel_on_clear: false,
        ..TopicTimerOptions::default()
    });
    let count = Arc::new(AtomicU32::new(0));

    let handle = timers
        .add_periodic_timer("t", "n", Duration::from_secs(1), counting(&count))
        .unwrap();
    timers.clear_periodic_timer("t");

    assert!(!timers.is_registered("t"));
    assert!(!timers.is_periodic_timer_active("t", "n"));
    assert!(run_loop.is_timer_active(handle));

    run_loop.run_for(Duration::from_millis(2500)).await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[test]
fn test_clear_absent_topic_is_noop() {
    let (_run_loop, timers) = registry();
    timers.clear_periodic_timer("missing");
    assert_eq!(timers.topic_count(), 0);
}

#[test]
fn test_empty_topic_is_retained_until_clear() {
    let (_run_loop, timers) = registry();

    timers
        .add_periodic_timer("t", "n", Duration::from_secs(1), || {})
        .unwrap();
    timers.cancel_periodic_timer("t", "n");

    assert!(timers.is_registered("t"));
    assert!(timers.periodic_timers("t").is_empty());

    timers.clear_periodic_timer("t");
    assert!(!timers.is_registered("t"));
}

#[test]
fn test_empty_topic_collapses_when_not_retained() {
    let (_run_loop, timers) = registry_with(TopicTimerOptions {
        retain_empty_topics: false,
        ..TopicTimerOptions::default()
    });

    timers
        .add_periodic_timer("t", "a", Duration::from_secs(1), || {})
        .unwrap();
    timers
        .add_periodic_timer("t", "b", Duration::from_secs(1), || {})
        .unwrap();

    timers.cancel_periodic_timer("t", "a");
    assert!(timers.is_registered("t"));
    timers.cancel_periodic_timer("t", "b");
    assert!(!timers.is_registered("t"));
}

#[test]
fn test_entries_follow_topic_insertion_order() {
    let (_run_loop, timers) = registry();

    let b = timers
        .add_periodic_timer("beta", "x", Duration::from_secs(1), || {})
        .unwrap();
    let a1 = timers
        .add_periodic_timer("alpha", "one", Duration::from_secs(1), || {})
        .unwrap();
    let a2 = timers
        .add_periodic_timer("alpha", "two", Duration::from_secs(1), || {})
        .unwrap();

    let entries = timers.entries();
    assert_eq!(
        entries,
        vec![
            TopicTimers {
                topic: "beta".to_string(),
                timers: vec![("x".to_string(), b)],
            },
            TopicTimers {
                topic: "alpha".to_string(),
                timers: vec![("one".to_string(), a1), ("two".to_string(), a2)],
            },
        ]
    );
}
