//! Task lifecycle states.
//!
//! ```text
//! NotStarted ──► Running ──┬──► Completed
//!                          ├──► Failed
//!                          └──► Canceled
//! ```
//!
//! `Completed` and `Canceled` are terminal. `Failed` is terminal for a
//! task; a parent whose sub-task failed is marked `Failed` but may
//! return to `Running` if its body handles the error and keeps going.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a monitored task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// `task` has not been called yet.
    #[default]
    NotStarted,
    /// The task body is executing.
    Running,
    /// The task body returned normally.
    Completed,
    /// The task body (or one of its sub-tasks) failed.
    Failed,
    /// The task observed a cancellation request at a checkpoint.
    Canceled,
}

impl TaskStatus {
    /// Returns true for `Completed`, `Failed` and `Canceled`.
    #[inline]
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Canceled)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotStarted => "not started",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_not_started() {
        assert_eq!(TaskStatus::default(), TaskStatus::NotStarted);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!TaskStatus::NotStarted.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Canceled.is_terminal());
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&TaskStatus::NotStarted).unwrap();
        assert_eq!(json, "\"not_started\"");
        let parsed: TaskStatus = serde_json::from_str("\"canceled\"").unwrap();
        assert_eq!(parsed, TaskStatus::Canceled);
    }
}
