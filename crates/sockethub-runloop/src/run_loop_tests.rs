use super::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use crate::error::RunLoopError;
use crate::mode::RunLoopRunResult;

fn counter() -> (Arc<AtomicU32>, Arc<AtomicU32>) {
    let c = Arc::new(AtomicU32::new(0));
    (c.clone(), c)
}

#[tokio::test]
async fn test_runloop_new() {
    let run_loop = RunLoop::default();
    assert_eq!(run_loop.state(), RunLoopState::Created);
    assert_eq!(run_loop.timer_count(), 0);
}

#[tokio::test]
async fn test_runloop_stop() {
    let run_loop = Arc::new(RunLoop::default());
    let run_loop_clone = run_loop.clone();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        run_loop_clone.stop();
    });

    let result = run_loop.run_for(Duration::from_secs(10)).await;
    assert!(matches!(result, Ok(RunLoopRunResult::Stopped)));
    assert_eq!(run_loop.state(), RunLoopState::Stopped);
}

#[tokio::test]
async fn test_runloop_timeout() {
    let run_loop = RunLoop::default();

    let result = run_loop.run_for(Duration::from_millis(50)).await;
    assert!(matches!(result, Ok(RunLoopRunResult::TimedOut)));
}

#[tokio::test]
async fn test_stop_before_run_returns_immediately() {
    let run_loop = RunLoop::default();
    run_loop.stop();

    let result = run_loop.run_for(Duration::from_secs(10)).await;
    assert!(matches!(result, Ok(RunLoopRunResult::Stopped)));

    // The stop request is consumed.
    let result = run_loop.run_for(Duration::from_millis(10)).await;
    assert!(matches!(result, Ok(RunLoopRunResult::TimedOut)));
}

#[tokio::test]
async fn test_concurrent_run_is_rejected() {
    let run_loop = Arc::new(RunLoop::default());
    let background = run_loop.clone();
    let handle = tokio::spawn(async move { background.run_for(Duration::from_millis(200)).await });

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(run_loop.is_running());
    let second = run_loop.run_for(Duration::from_millis(10)).await;
    assert!(matches!(second, Err(RunLoopError::AlreadyRunning)));

    run_loop.stop();
    let first = handle.await.unwrap();
    assert!(first.is_ok());
    assert!(!run_loop.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_periodic_timer_fires_each_interval() {
    let run_loop = RunLoop::default();
    let (count, c) = counter();

    run_loop
        .add_periodic_timer(Duration::from_secs(1), move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    let result = run_loop.run_for(Duration::from_millis(3500)).await.unwrap();
    assert_eq!(result, RunLoopRunResult::TimedOut);
    assert_eq!(count.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_periodic_timer_does_not_fire_before_first_interval() {
    let run_loop = RunLoop::default();
    let (count, c) = counter();

    run_loop
        .add_periodic_timer(Duration::from_secs(2), move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    run_loop.run_for(Duration::from_millis(1900)).await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_zero_interval_is_rejected() {
    let run_loop = RunLoop::default();
    let result = run_loop.add_periodic_timer(Duration::ZERO, || {});
    assert!(matches!(result, Err(RunLoopError::InvalidInterval(_))));
    assert_eq!(run_loop.timer_count(), 0);
}

#[tokio::test]
async fn test_unrepresentable_interval_is_rejected() {
    let run_loop = RunLoop::default();
    let result = run_loop.add_periodic_timer(Duration::MAX, || {});
    assert!(matches!(result, Err(RunLoopError::InvalidInterval(_))));
    assert_eq!(run_loop.timer_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_huge_one_shot_delay_does_not_disturb_loop() {
    let run_loop = RunLoop::default();
    let (huge, h) = counter();
    let (beats, b) = counter();

    let parked = run_loop.add_timer(Duration::MAX, move || {
        h.fetch_add(1, Ordering::SeqCst);
    });
    run_loop
        .add_periodic_timer(Duration::from_secs(1), move || {
            b.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    let result = run_loop.run_for(Duration::from_millis(10_500)).await.unwrap();
    assert_eq!(result, RunLoopRunResult::TimedOut);
    assert_eq!(beats.load(Ordering::SeqCst), 10);
    assert_eq!(huge.load(Ordering::SeqCst), 0);
    assert!(run_loop.is_timer_active(parked));
    assert!(run_loop.cancel_timer(parked));
}

#[tokio::test(start_paused = true)]
async fn test_one_shot_timer_fires_once() {
    let run_loop = RunLoop::default();
    let (count, c) = counter();

    let handle = run_loop.add_timer(Duration::from_millis(100), move || {
        c.fetch_add(1, Ordering::SeqCst);
    });

    run_loop.run_for(Duration::from_secs(2)).await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(!run_loop.is_timer_active(handle));
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_timer_never_fires() {
    let run_loop = RunLoop::default();
    let (count, c) = counter();

    let handle = run_loop
        .add_periodic_timer(Duration::from_secs(1), move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    assert!(run_loop.cancel_timer(handle));
    assert!(!run_loop.cancel_timer(handle));

    run_loop.run_for(Duration::from_secs(5)).await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_same_interval_timers_fire_in_registration_order() {
    let run_loop = RunLoop::default();
    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

    for name in ["a", "b", "c"] {
        let order = order.clone();
        run_loop
            .add_periodic_timer(Duration::from_secs(1), move || order.lock().push(name))
            .unwrap();
    }

    run_loop.run_for(Duration::from_millis(2500)).await.unwrap();
    assert_eq!(*order.lock(), vec!["a", "b", "c", "a", "b", "c"]);
}

#[tokio::test(start_paused = true)]
async fn test_timer_cancelled_by_earlier_callback_in_same_tick() {
    let run_loop = Arc::new(RunLoop::default());
    let (count, c) = counter();
    let victim = Arc::new(parking_lot::Mutex::new(None));

    let rl = run_loop.clone();
    let v = victim.clone();
    run_loop
        .add_periodic_timer(Duration::from_secs(1), move || {
            if let Some(handle) = v.lock().take() {
                rl.cancel_timer(handle);
            }
        })
        .unwrap();
    let handle = run_loop
        .add_periodic_timer(Duration::from_secs(1), move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    *victim.lock() = Some(handle);

    run_loop.run_for(Duration::from_secs(3)).await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_panicking_timer_is_isolated() {
    let run_loop = RunLoop::default();
    let (count, c) = counter();

    run_loop
        .add_periodic_timer(Duration::from_secs(1), || panic!("tick failed"))
        .unwrap();
    run_loop
        .add_periodic_timer(Duration::from_secs(1), move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    let result = run_loop.run_for(Duration::from_millis(2500)).await;
    assert!(result.is_ok());
    assert_eq!(count.load(Ordering::SeqCst), 2);
    assert_eq!(run_loop.metrics().snapshot().callback_panics, 2);
    assert_eq!(run_loop.timer_count(), 2);
}

#[tokio::test]
async fn test_perform_runs_blocks_in_order() {
    let run_loop = Arc::new(RunLoop::default());
    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

    for i in 0..3 {
        let order = order.clone();
        run_loop.perform(move || order.lock().push(i));
    }
    let rl = run_loop.clone();
    run_loop.perform(move || rl.stop());

    let result = run_loop.run_for(Duration::from_secs(5)).await.unwrap();
    assert_eq!(result, RunLoopRunResult::Stopped);
    assert_eq!(*order.lock(), vec![0, 1, 2]);
    assert_eq!(run_loop.metrics().snapshot().blocks_performed, 4);
}

#[tokio::test]
async fn test_perform_from_other_task_wakes_loop() {
    let run_loop = Arc::new(RunLoop::default());
    let (count, c) = counter();

    let rl = run_loop.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let stopper = rl.clone();
        rl.perform(move || {
            c.fetch_add(1, Ordering::SeqCst);
            stopper.stop();
        });
    });

    let result = run_loop.run_for(Duration::from_secs(10)).await.unwrap();
    assert_eq!(result, RunLoopRunResult::Stopped);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}
