//! Memory usage sampling periodic, installed when the server runs with
//! profiling enabled.

use std::time::Duration;

use parking_lot::Mutex;
use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::info;

use crate::periodic::Periodic;

/// Logs the resident memory of the current process on every tick.
pub struct MemoryUsagePeriodic {
    interval: Duration,
    pid: Option<Pid>,
    system: Mutex<System>,
}

impl MemoryUsagePeriodic {
    pub const NAME: &'static str = "MemoryUsagePeriodic";

    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            pid: sysinfo::get_current_pid().ok(),
            system: Mutex::new(System::new()),
        }
    }

    /// Resident memory of this process in bytes.
    pub fn sample(&self) -> Option<u64> {
        let pid = self.pid?;
        let mut system = self.system.lock();
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        system.process(pid).map(|process| process.memory())
    }
}

impl Periodic for MemoryUsagePeriodic {
    fn tick(&self) -> anyhow::Result<()> {
        let bytes = self
            .sample()
            .ok_or_else(|| anyhow::anyhow!("current process not found in process table"))?;
        info!(memory_bytes = bytes, "Memory usage : {}", format_bytes(bytes));
        Ok(())
    }

    fn timeout(&self) -> Duration {
        self.interval
    }

    fn display_name(&self) -> &str {
        Self::NAME
    }
}

/// Format a byte count with a binary unit suffix.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(10 * 1024 * 1024), "10.00 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn test_periodic_metadata() {
        let periodic = MemoryUsagePeriodic::new(Duration::from_secs(5));
        assert_eq!(periodic.display_name(), "MemoryUsagePeriodic");
        assert_eq!(periodic.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_sample_current_process() {
        let periodic = MemoryUsagePeriodic::new(Duration::from_secs(1));
        let bytes = periodic.sample().expect("current process is visible");
        assert!(bytes > 0);
        assert!(periodic.tick().is_ok());
    }
}
