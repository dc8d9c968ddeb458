//! # SocketHub RunLoop
//!
//! Single-threaded cooperative event loop for the SocketHub server.
//!
//! ## Design Inspiration
//!
//! The loop follows the CFRunLoop model: one execution context pulls ready
//! work and runs it to completion, then sleeps until something wakes it.
//!
//! - **Timers**: one-shot and periodic callbacks ordered by deadline, then by
//!   registration order
//! - **Blocks**: closures posted from other tasks with [`RunLoop::perform`]
//! - **Source1**: port-triggered sources fed through a channel (the push
//!   transport bridge is one)
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          RunLoop                              │
//! │   Timers ──────┬── PeriodicRegistry (process-wide periodics)  │
//! │                └── TopicPeriodicTimer (per-topic periodics)   │
//! │   Blocks ─────────── socket events marshalled by the server   │
//! │   Source1 ────────── PushBridge (length-delimited TCP frames) │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use sockethub_runloop::{RunLoop, RunLoopConfig};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let run_loop = Arc::new(RunLoop::new(RunLoopConfig::default()));
//!
//!     run_loop
//!         .add_periodic_timer(Duration::from_secs(1), || println!("tick"))
//!         .expect("interval is positive");
//!
//!     let _ = run_loop.run_for(Duration::from_secs(5)).await;
//! }
//! ```

pub mod config;
pub mod error;
pub mod integration;
pub mod memory_usage;
pub mod metrics;
pub mod mode;
pub mod periodic;
pub mod run_loop;
mod run_loop_accessors;
mod run_loop_execution;
mod run_loop_processing;
mod run_loop_timers;
mod run_loop_wakeup;
pub mod source;
pub mod timer;
pub mod topic_timer;

// Re-exports
pub use config::RunLoopConfig;
pub use error::{RunLoopError, RunLoopResult};
pub use memory_usage::MemoryUsagePeriodic;
pub use metrics::{MetricsSnapshot, RunLoopMetrics};
pub use mode::{RunLoopRunResult, RunLoopState};
pub use periodic::{Periodic, PeriodicRegistry};
pub use run_loop::{RunLoop, WakeupSignal};
pub use source::{PortMessage, Source1, Source1Receiver};
pub use timer::TimerHandle;
pub use topic_timer::{TopicPeriodicTimer, TopicTimerOptions, TopicTimers};

// Re-export CancellationToken for convenience
pub use tokio_util::sync::CancellationToken;

// Push transport exports
pub use integration::push_bridge::{PushBridge, PushEndpoint, PushHandler, PushTransport};
pub use integration::push_client::PushClient;
