//! Error types for progress monitoring.
//!
//! Distinguishes programming errors (invalid state, bad arguments),
//! the cooperative cancellation signal, and failures raised by the
//! caller-supplied task bodies.

use thiserror::Error;

/// Result type alias for monitor operations.
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Errors that can occur while running monitored tasks.
///
/// # Propagation
///
/// The monitor never swallows an error. Every variant raised inside a
/// task body is re-raised unchanged to the caller of `task`/`sub_task`
/// after the monitor status has been updated and listeners notified.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Operation called in the wrong lifecycle state.
    ///
    /// Raised for a second `task` call on the same monitor, or for
    /// `sub_task`/`worked` before `task` has started. Not retryable.
    #[error("invalid monitor state: {0}")]
    InvalidState(String),

    /// Invalid argument passed to a monitor operation.
    #[error("precondition violation: {0}")]
    PreconditionViolation(String),

    /// `cancel` called on a monitor created without cancellation support.
    #[error("this progress monitor is not cancelable")]
    NotCancelable,

    /// Cooperative cancellation signal raised at a checkpoint.
    ///
    /// Expected control flow, not a bug. Propagates through every
    /// enclosing scope up to the caller of the outermost `task`.
    #[error("progress monitor for task [{task}] has been canceled")]
    Canceled {
        /// Name of the task whose checkpoint observed the cancellation.
        task: String,
    },

    /// Failure raised by a caller-supplied task body.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),

    /// A task body panicked.
    ///
    /// Only ever handed to listeners; the panic itself is resumed.
    #[error("task body panicked: {0}")]
    Panicked(String),
}

impl MonitorError {
    /// Returns true if this is the cancellation signal.
    #[inline]
    #[must_use]
    pub const fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled { .. })
    }

    pub(crate) fn canceled(task: impl Into<String>) -> Self {
        Self::Canceled { task: task.into() }
    }
}
