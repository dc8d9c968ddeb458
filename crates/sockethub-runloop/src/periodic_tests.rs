use super::*;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::RunLoopError;

struct CountingPeriodic {
    name: String,
    interval: Duration,
    ticks: AtomicU32,
    fail: bool,
}

impl CountingPeriodic {
    fn new(name: &str, interval: Duration) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            interval,
            ticks: AtomicU32::new(0),
            fail: false,
        })
    }

    fn failing(name: &str, interval: Duration) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            interval,
            ticks: AtomicU32::new(0),
            fail: true,
        })
    }
}

impl Periodic for CountingPeriodic {
    fn tick(&self) -> anyhow::Result<()> {
        self.ticks.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("{} failed", self.name);
        }
        Ok(())
    }

    fn timeout(&self) -> Duration {
        self.interval
    }

    fn display_name(&self) -> &str {
        &self.name
    }
}

#[test]
fn test_registry_keeps_insertion_order() {
    let mut registry = PeriodicRegistry::new();
    registry.add_periodic(CountingPeriodic::new("a", Duration::from_secs(1)));
    registry.add_periodic(CountingPeriodic::new("b", Duration::from_secs(1)));
    registry.add_periodic_first(CountingPeriodic::new("first", Duration::from_secs(1)));

    let names: Vec<_> = registry.periodics().iter().map(|p| p.display_name()).collect();
    assert_eq!(names, vec!["first", "a", "b"]);
    assert_eq!(registry.len(), 3);
    assert!(registry.contains("a"));
    assert!(!registry.contains("missing"));
}

#[test]
fn test_registry_debug_lists_names() {
    let mut registry = PeriodicRegistry::new();
    assert!(registry.is_empty());
    registry.add_periodic(CountingPeriodic::new("gc", Duration::from_secs(1)));
    assert_eq!(format!("{:?}", registry), r#"["gc"]"#);
}

#[tokio::test(start_paused = true)]
async fn test_schedule_periodic_ticks_at_interval() {
    let run_loop = RunLoop::default();
    let periodic = CountingPeriodic::new("counter", Duration::from_secs(2));

    let handle = schedule_periodic(&run_loop, periodic.clone()).unwrap();
    assert!(run_loop.is_timer_active(handle));

    run_loop.run_for(Duration::from_millis(6500)).await.unwrap();
    assert_eq!(periodic.ticks.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_failing_tick_keeps_timer_running() {
    let run_loop = RunLoop::default();
    let periodic = CountingPeriodic::failing("broken", Duration::from_secs(1));

    let handle = schedule_periodic(&run_loop, periodic.clone()).unwrap();
    run_loop.run_for(Duration::from_millis(3500)).await.unwrap();

    assert_eq!(periodic.ticks.load(Ordering::SeqCst), 3);
    assert!(run_loop.is_timer_active(handle));
}

#[test]
fn test_schedule_periodic_rejects_zero_timeout() {
    let run_loop = RunLoop::default();
    let periodic = CountingPeriodic::new("zero", Duration::ZERO);

    let result = schedule_periodic(&run_loop, periodic);
    assert!(matches!(result, Err(RunLoopError::InvalidInterval(_))));
}
