//! Immutable progress snapshots.

use crate::status::TaskStatus;
use serde::{Deserialize, Serialize};

/// Point-in-time view of a monitor and its sub-tasks.
///
/// The aggregate counters of a snapshot always come from a single
/// critical section of the monitor that produced it, so `work_done`
/// and `work_percentage` never disagree.
///
/// # Example
///
/// ```rust
/// use promon_monitor::{ProgressMonitor, TaskStatus};
///
/// let monitor = ProgressMonitor::new();
/// let before = monitor.progress();
/// assert_eq!(before.status, TaskStatus::NotStarted);
/// assert!(before.task_name.is_empty());
///
/// monitor.task("Hello World", 10, || monitor.worked(4))?;
/// let after = monitor.progress();
/// assert_eq!(after.work_done, 10);
/// assert!(after.is_complete());
/// # Ok::<(), promon_monitor::MonitorError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    /// Task name; empty before the task starts.
    pub task_name: String,
    /// Work budget of the task; 0 before the task starts.
    pub total_work: u64,
    /// Completed work including the share reported by running sub-tasks.
    pub work_done: u64,
    /// `work_done / total_work`, or 0.0 when no budget is set.
    pub work_percentage: f64,
    /// Lifecycle state.
    pub status: TaskStatus,
    /// Snapshots of sub-tasks whose scope exited successfully, in order.
    pub completed_subtasks: Vec<Progress>,
    /// Snapshots of sub-tasks that are still open.
    pub active_subtasks: Vec<Progress>,
}

impl Progress {
    /// Builds a snapshot, clamping `work_done` to `total_work`.
    pub(crate) fn new(
        task_name: String,
        total_work: u64,
        work_done: u64,
        status: TaskStatus,
        completed_subtasks: Vec<Progress>,
        active_subtasks: Vec<Progress>,
    ) -> Self {
        let work_done = work_done.min(total_work);
        let work_percentage = if total_work == 0 {
            0.0
        } else {
            work_done as f64 / total_work as f64
        };
        Self {
            task_name,
            total_work,
            work_done,
            work_percentage,
            status,
            completed_subtasks,
            active_subtasks,
        }
    }

    /// Returns true if the task finished successfully.
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Work still outstanding.
    #[inline]
    #[must_use]
    pub const fn remaining_work(&self) -> u64 {
        self.total_work.saturating_sub(self.work_done)
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new(
            String::new(),
            0,
            0,
            TaskStatus::NotStarted,
            Vec::new(),
            Vec::new(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_snapshot() {
        let progress = Progress::default();
        assert!(progress.task_name.is_empty());
        assert_eq!(progress.total_work, 0);
        assert_eq!(progress.work_done, 0);
        assert_eq!(progress.work_percentage, 0.0);
        assert_eq!(progress.status, TaskStatus::NotStarted);
    }

    #[test]
    fn test_work_done_is_clamped() {
        let progress = Progress::new(
            "t".into(),
            10,
            25,
            TaskStatus::Running,
            Vec::new(),
            Vec::new(),
        );
        assert_eq!(progress.work_done, 10);
        assert_eq!(progress.work_percentage, 1.0);
        assert_eq!(progress.remaining_work(), 0);
    }

    #[test]
    fn test_percentage() {
        let progress = Progress::new(
            "t".into(),
            8,
            2,
            TaskStatus::Running,
            Vec::new(),
            Vec::new(),
        );
        assert!((progress.work_percentage - 0.25).abs() < f64::EPSILON);
        assert_eq!(progress.remaining_work(), 6);
        assert!(!progress.is_complete());
    }

    #[test]
    fn test_serialization() {
        let child = Progress::new(
            "child".into(),
            4,
            4,
            TaskStatus::Completed,
            Vec::new(),
            Vec::new(),
        );
        let progress = Progress::new(
            "root".into(),
            10,
            4,
            TaskStatus::Running,
            vec![child],
            Vec::new(),
        );
        let json = serde_json::to_string(&progress).unwrap();
        let parsed: Progress = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, progress);
        assert_eq!(parsed.completed_subtasks[0].task_name, "child");
    }
}
