//! Observer hooks for monitor events.
//!
//! Listeners are registered per monitor. A parent's listeners are not
//! invoked for events on its sub-task monitors; register on the child
//! if those are wanted.
//!
//! # Dispatch
//!
//! Hooks run synchronously on the thread that caused the event, while
//! the monitor's lock is held. A listener must not call back into the
//! monitor it is registered on. Panics raised by a hook are not caught.

use crate::error::MonitorError;
use crate::progress::Progress;
use std::sync::Arc;

/// Callback interface for monitor events.
///
/// Every hook defaults to a no-op; implement only what you need.
///
/// # Example
///
/// ```rust
/// use promon_monitor::{ProgressListener, ProgressMonitor};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct FinishFlag(AtomicBool);
///
/// impl ProgressListener for FinishFlag {
///     fn on_task_finished(&self, _name: &str) {
///         self.0.store(true, Ordering::SeqCst);
///     }
/// }
///
/// let flag = Arc::new(FinishFlag::default());
/// let monitor = ProgressMonitor::new();
/// monitor.add_listener(flag.clone());
/// monitor.task("Hello World", 1, || Ok(()))?;
/// assert!(flag.0.load(Ordering::SeqCst));
/// # Ok::<(), promon_monitor::MonitorError>(())
/// ```
pub trait ProgressListener: Send + Sync {
    /// Work was reported; `work` is the delta in this monitor's units.
    fn on_worked(&self, work: f64) {
        let _ = work;
    }

    /// `task` was called and the budget set.
    fn on_task_started(&self, name: &str, total_work: u64) {
        let _ = (name, total_work);
    }

    /// The task body returned normally.
    fn on_task_finished(&self, name: &str) {
        let _ = name;
    }

    /// The task body failed with `cause`.
    fn on_task_failed(&self, name: &str, cause: &MonitorError) {
        let _ = (name, cause);
    }

    /// The first cancellation request reached the root monitor.
    fn on_cancel_requested(&self) {}

    /// The task stopped at a cancellation checkpoint.
    fn on_task_canceled(&self, progress: &Progress) {
        let _ = progress;
    }
}

/// Listener set keyed by `Arc` identity.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    listeners: Vec<Arc<dyn ProgressListener>>,
}

impl ListenerRegistry {
    /// Adds a listener; re-adding the same `Arc` is a no-op.
    pub(crate) fn add(&mut self, listener: Arc<dyn ProgressListener>) {
        if !self.contains(&listener) {
            self.listeners.push(listener);
        }
    }

    /// Removes a listener. Returns true if it was registered.
    pub(crate) fn remove(&mut self, listener: &Arc<dyn ProgressListener>) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| !Arc::ptr_eq(l, listener));
        self.listeners.len() != before
    }

    fn contains(&self, listener: &Arc<dyn ProgressListener>) -> bool {
        self.listeners.iter().any(|l| Arc::ptr_eq(l, listener))
    }

    pub(crate) fn to_vec(&self) -> Vec<Arc<dyn ProgressListener>> {
        self.listeners.clone()
    }

    /// Delivers one event to every listener in registration order.
    pub(crate) fn fire(&self, event: impl Fn(&dyn ProgressListener)) {
        for listener in &self.listeners {
            event(listener.as_ref());
        }
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("len", &self.listeners.len())
            .finish()
    }
}
