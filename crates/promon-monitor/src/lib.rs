//! # Progress Monitor
//!
//! Hierarchical progress tracking for long-running work: a root task
//! divided into sub-tasks, each of which may be subdivided again, with
//! the work budget allocated top-down and progress aggregated bottom-up.
//!
//! ## Components
//!
//! | Component | Purpose |
//! |-----------|---------|
//! | [`ProgressMonitor`] | Root or sub-task monitor: `task`, `sub_task`, `worked` |
//! | [`Progress`] | Immutable snapshot of a monitor and its sub-tasks |
//! | [`TaskStatus`] | Lifecycle state machine |
//! | [`ProgressListener`] | Synchronous observer hooks, all no-op by default |
//! | [`MonitorConfig`] | Root options (cancelability) |
//!
//! ## Quick Start
//!
//! ```rust
//! use promon_monitor::{ProgressMonitor, TaskStatus};
//!
//! let monitor = ProgressMonitor::new();
//!
//! monitor.task("Import", 100, || {
//!     // 90 of our 100 units go to a sub-task with its own budget
//!     monitor.sub_task(90, |sub| {
//!         sub.task("Rows", 10, || {
//!             for _ in 0..10 {
//!                 sub.worked(1)?;
//!             }
//!             Ok(())
//!         })
//!     })?;
//!     monitor.worked(10)
//! })?;
//!
//! let progress = monitor.progress();
//! assert_eq!(progress.status, TaskStatus::Completed);
//! assert_eq!(progress.work_done, 100);
//! assert_eq!(progress.completed_subtasks.len(), 1);
//! # Ok::<(), promon_monitor::MonitorError>(())
//! ```
//!
//! ## Cancellation
//!
//! Cancellation is cooperative. It is checked at `task` and `sub_task`
//! entry and on every work report, and surfaces as
//! [`MonitorError::Canceled`], which bodies propagate with `?`:
//!
//! ```rust
//! use promon_monitor::{ProgressMonitor, TaskStatus};
//!
//! let monitor = ProgressMonitor::cancelable();
//! let result = monitor.task("Batch", 100, || {
//!     for i in 0..100 {
//!         monitor.worked(1)?;
//!         if i == 42 {
//!             monitor.cancel()?;
//!         }
//!     }
//!     Ok(())
//! });
//!
//! assert!(result.unwrap_err().is_canceled());
//! assert_eq!(monitor.progress().status, TaskStatus::Canceled);
//! ```
//!
//! ## Thread Safety
//!
//! Monitors are `Send + Sync`. Each monitor guards its state with its
//! own lock; listener hooks run while that lock is held and must not
//! call back into the same monitor.

mod child;
mod config;
mod error;
mod listener;
mod monitor;
mod progress;
mod root;
mod status;

pub use config::MonitorConfig;
pub use error::{MonitorError, Result};
pub use listener::ProgressListener;
pub use monitor::ProgressMonitor;
pub use progress::Progress;
pub use status::TaskStatus;
