//! # Progress Monitor
//!
//! The engine shared by root and sub-task monitors: work counters,
//! the active/completed sub-task bookkeeping, listener dispatch,
//! snapshot production and the cancellation checkpoints.
//!
//! ## Work Accounting
//!
//! Budgets flow top-down and progress flows bottom-up:
//!
//! ```text
//!   root (100) ── sub_task(40) ──► child (any budget, e.g. 1000)
//!        ▲                             │
//!        └──── 40 * child fraction ────┘   (forwarded on every report)
//! ```
//!
//! A monitor's effective work is its own counter plus the parent units
//! forwarded by its open sub-tasks, clamped to its budget. When a
//! sub-task scope exits successfully the forwarded share is replaced by
//! the full allocation, whether or not the child reported all of it.
//!
//! ## Locking
//!
//! Each monitor owns one `parking_lot::Mutex`. The only nested
//! acquisition is child → parent (forwarding). A parent never locks a
//! child while holding its own lock.
//!
//! ## Example
//!
//! ```rust
//! use promon_monitor::ProgressMonitor;
//!
//! let monitor = ProgressMonitor::new();
//! monitor.task("Parent Task", 100, || {
//!     monitor.sub_task(10, |sub| {
//!         sub.task("Sub 1", 1000, || {
//!             sub.worked(500)?;
//!             assert_eq!(monitor.progress().work_done, 5);
//!             sub.worked(500)
//!         })
//!     })?;
//!     monitor.worked(90)
//! })?;
//!
//! assert_eq!(monitor.progress().work_percentage, 1.0);
//! # Ok::<(), promon_monitor::MonitorError>(())
//! ```

use crate::child::ParentLink;
use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result};
use crate::listener::{ListenerRegistry, ProgressListener};
use crate::progress::Progress;
use crate::root::CancelFlag;
use crate::status::TaskStatus;

use parking_lot::{Mutex, MutexGuard};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Identity of a sub-task within its parent.
pub(crate) type ChildId = u64;

/// Handle to a monitor in a progress tree.
///
/// Cloning is cheap and yields another handle to the same monitor.
/// Handles are `Send + Sync`; worker threads may report work on a
/// shared monitor concurrently.
///
/// # Example
///
/// ```rust
/// use promon_monitor::{ProgressMonitor, TaskStatus};
///
/// let monitor = ProgressMonitor::new();
/// monitor.task("Hello World", 10, || {
///     for _ in 0..10 {
///         monitor.worked(1)?;
///     }
///     Ok(())
/// })?;
///
/// let progress = monitor.progress();
/// assert_eq!(progress.status, TaskStatus::Completed);
/// assert_eq!(progress.work_done, 10);
/// # Ok::<(), promon_monitor::MonitorError>(())
/// ```
#[derive(Clone)]
pub struct ProgressMonitor {
    shared: Arc<Shared>,
}

/// State and identity shared by every handle to one monitor.
pub(crate) struct Shared {
    kind: Kind,
    state: Mutex<State>,
}

/// Root monitors own the cancellation flag; children link to a parent.
enum Kind {
    Root(CancelFlag),
    Child(ParentLink),
}

#[derive(Default)]
struct State {
    task_name: String,
    /// 0 until `task` is called.
    total_work: u64,
    work_done: u64,
    status: TaskStatus,
    /// True only while the `task` body is executing.
    body_running: bool,
    completed: Vec<Progress>,
    active: BTreeMap<ChildId, ActiveChild>,
    next_child_id: ChildId,
    listeners: ListenerRegistry,
}

/// An open sub-task and the parent units it has reported so far.
struct ActiveChild {
    monitor: Arc<Shared>,
    reported: f64,
}

impl State {
    fn reported_by_children(&self) -> f64 {
        self.active.values().map(|child| child.reported).sum()
    }

    /// Completion fraction including the share of open sub-tasks.
    fn effective_fraction(&self) -> f64 {
        if self.total_work == 0 {
            return 0.0;
        }
        let total = self.total_work as f64;
        (self.work_done as f64 + self.reported_by_children()).min(total) / total
    }
}

impl ProgressMonitor {
    /// Creates a root monitor that cannot be canceled.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MonitorConfig::new())
    }

    /// Creates a root monitor that accepts [`cancel`](Self::cancel).
    #[must_use]
    pub fn cancelable() -> Self {
        Self::with_config(MonitorConfig::new().with_allow_cancellation(true))
    }

    /// Creates a root monitor with custom configuration.
    #[must_use]
    pub fn with_config(config: MonitorConfig) -> Self {
        Self::from_kind(Kind::Root(CancelFlag::new(config.allow_cancellation)))
    }

    fn child_of(parent: &Arc<Shared>, id: ChildId, allocated: u64) -> Self {
        Self::from_kind(Kind::Child(ParentLink::new(parent, id, allocated)))
    }

    fn from_kind(kind: Kind) -> Self {
        Self {
            shared: Arc::new(Shared {
                kind,
                state: Mutex::new(State::default()),
            }),
        }
    }

    #[cfg(test)]
    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }

    /// Runs this monitor's one and only task.
    ///
    /// Sets the task name and budget, fires `on_task_started`, checks
    /// for cancellation, and runs `body`. On success the task is
    /// `Completed` and its work forced to 100 %. The body's error (or
    /// panic) is re-raised after the status has been set to `Failed`,
    /// or `Canceled` for the cancellation signal.
    ///
    /// # Errors
    ///
    /// - [`MonitorError::PreconditionViolation`] if `total_work` is 0 or
    ///   `name` is blank.
    /// - [`MonitorError::InvalidState`] if `task` was already called on
    ///   this monitor.
    /// - [`MonitorError::Canceled`] if cancellation was requested before
    ///   or during the task.
    /// - Any error returned by `body`.
    pub fn task<T, F>(&self, name: &str, total_work: u64, body: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        if total_work == 0 {
            return Err(MonitorError::PreconditionViolation(
                "argument 'total_work' must be positive".to_string(),
            ));
        }
        if name.trim().is_empty() {
            return Err(MonitorError::PreconditionViolation(
                "argument 'name' must not be blank".to_string(),
            ));
        }

        {
            let mut state = self.shared.state.lock();
            if !state.task_name.is_empty() {
                return Err(MonitorError::InvalidState(format!(
                    "task(...) has already been called on monitor for [{}]",
                    state.task_name
                )));
            }
            state.task_name = name.to_string();
            state.total_work = total_work;
            state
                .listeners
                .fire(|l| l.on_task_started(name, total_work));

            if self.shared.is_canceled() {
                drop(state);
                return Err(self.mark_canceled(MonitorError::canceled(name)));
            }
            state.status = TaskStatus::Running;
            state.body_running = true;
        }
        info!("Task '{}' started with {} work units", name, total_work);

        match panic::catch_unwind(AssertUnwindSafe(body)) {
            Ok(Ok(value)) => {
                let mut state = self.shared.state.lock();
                state.body_running = false;
                state.status = TaskStatus::Completed;
                state.work_done = state.total_work;
                state.listeners.fire(|l| l.on_task_finished(name));
                drop(state);
                info!("Task '{}' completed", name);
                Ok(value)
            }
            Ok(Err(err)) if err.is_canceled() => Err(self.mark_canceled(err)),
            Ok(Err(err)) => {
                let mut state = self.shared.state.lock();
                state.body_running = false;
                state.status = TaskStatus::Failed;
                state.listeners.fire(|l| l.on_task_failed(name, &err));
                drop(state);
                warn!("Task '{}' failed: {}", name, err);
                Err(err)
            }
            Err(payload) => {
                let cause = MonitorError::Panicked(panic_message(payload.as_ref()));
                let mut state = self.shared.state.lock();
                state.body_running = false;
                state.status = TaskStatus::Failed;
                state.listeners.fire(|l| l.on_task_failed(name, &cause));
                drop(state);
                warn!("Task '{}' failed: {}", name, cause);
                panic::resume_unwind(payload)
            }
        }
    }

    /// Opens a sub-task worth `work_to_allocate` units of this task.
    ///
    /// `body` receives the child monitor and is expected to call
    /// [`task`](Self::task) on it with a budget of its own. While the
    /// scope is open, the child's progress counts proportionally towards
    /// this monitor. When `body` returns `Ok`, exactly
    /// `work_to_allocate` units are credited here, regardless of how
    /// much the child reported.
    ///
    /// On failure this monitor is marked `Failed`, the child's partial
    /// progress is dropped and the error is re-raised unchanged.
    ///
    /// # Errors
    ///
    /// - [`MonitorError::InvalidState`] if this monitor's task is not
    ///   running.
    /// - [`MonitorError::PreconditionViolation`] unless
    ///   `0 < work_to_allocate < total_work`.
    /// - [`MonitorError::Canceled`] if cancellation was requested.
    /// - Any error returned by `body`.
    pub fn sub_task<T, F>(&self, work_to_allocate: u64, body: F) -> Result<T>
    where
        F: FnOnce(&ProgressMonitor) -> Result<T>,
    {
        let (id, child) = {
            let mut state = self.shared.state.lock();
            if state.status == TaskStatus::NotStarted {
                return Err(MonitorError::InvalidState(
                    "cannot call sub_task before a task has been started".to_string(),
                ));
            }
            // a body that handled a failed sub-task may keep going
            if !state.body_running {
                return Err(MonitorError::InvalidState(format!(
                    "cannot call sub_task on task [{}] which is {}",
                    state.task_name, state.status
                )));
            }
            if work_to_allocate == 0 {
                return Err(MonitorError::PreconditionViolation(
                    "argument 'work_to_allocate' must be greater than zero".to_string(),
                ));
            }
            if work_to_allocate >= state.total_work {
                return Err(MonitorError::PreconditionViolation(format!(
                    "argument 'work_to_allocate' ({}) must be less than the total work of the parent task ({})",
                    work_to_allocate, state.total_work
                )));
            }

            let id = state.next_child_id;
            state.next_child_id += 1;
            let child = Self::child_of(&self.shared, id, work_to_allocate);

            if self.shared.is_canceled() {
                state.status = TaskStatus::Failed;
                return Err(MonitorError::canceled(state.task_name.clone()));
            }
            state.active.insert(
                id,
                ActiveChild {
                    monitor: Arc::clone(&child.shared),
                    reported: 0.0,
                },
            );
            state.status = TaskStatus::Running;
            (id, child)
        };
        debug!(
            "Sub-task #{} opened with {} work units of {}",
            id, work_to_allocate, self
        );

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(&child)));
        let child_progress = child.progress();

        let mut state = self.shared.state.lock();
        state.active.remove(&id);
        match outcome {
            Ok(Ok(value)) => {
                // credit the full allocation, not just what was forwarded
                let credited = self.shared.record_work(&mut state, work_to_allocate);
                if let Err(err) = credited {
                    state.status = TaskStatus::Failed;
                    return Err(err);
                }
                state.completed.push(child_progress);
                drop(state);
                debug!("Sub-task #{} of {} completed", id, self);
                Ok(value)
            }
            Ok(Err(err)) => {
                state.status = TaskStatus::Failed;
                drop(state);
                debug!("Sub-task #{} of {} failed: {}", id, self, err);
                Err(err)
            }
            Err(payload) => {
                state.status = TaskStatus::Failed;
                drop(state);
                panic::resume_unwind(payload)
            }
        }
    }

    /// Reports `amount` units of completed work on this monitor.
    ///
    /// Work beyond the budget is silently discarded. A sub-task monitor
    /// also forwards its new completion fraction to its parent.
    ///
    /// # Errors
    ///
    /// - [`MonitorError::Canceled`] if cancellation was requested; no
    ///   work is recorded.
    /// - [`MonitorError::InvalidState`] if the task has not started.
    pub fn worked(&self, amount: u64) -> Result<()> {
        let mut state = self.shared.state.lock();
        if state.status == TaskStatus::NotStarted {
            return Err(MonitorError::InvalidState(
                "cannot report work before a task has been started".to_string(),
            ));
        }
        let applied = self.shared.record_work(&mut state, amount)?;
        if applied > 0 {
            state.listeners.fire(|l| l.on_worked(applied as f64));
        }
        MutexGuard::unlock_fair(state);
        Ok(())
    }

    /// Requests cooperative cancellation of the whole monitor tree.
    ///
    /// On a sub-task monitor the request is delegated to the root. Only
    /// the first request fires `on_cancel_requested`; later ones are
    /// no-ops.
    ///
    /// # Errors
    ///
    /// [`MonitorError::NotCancelable`] if the root was created without
    /// cancellation support.
    pub fn cancel(&self) -> Result<()> {
        self.shared.cancel()
    }

    /// Returns true once cancellation has been requested anywhere in
    /// the tree.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.shared.is_canceled()
    }

    /// Takes a snapshot of this monitor and its sub-tasks.
    #[must_use]
    pub fn progress(&self) -> Progress {
        self.shared.snapshot()
    }

    /// Name of the task; empty before [`task`](Self::task) is called.
    #[must_use]
    pub fn task_name(&self) -> String {
        self.shared.state.lock().task_name.clone()
    }

    /// Registers a listener on this monitor.
    pub fn add_listener(&self, listener: Arc<dyn ProgressListener>) {
        self.shared.state.lock().listeners.add(listener);
    }

    /// Unregisters a listener. Returns true if it was registered.
    pub fn remove_listener(&self, listener: &Arc<dyn ProgressListener>) -> bool {
        self.shared.state.lock().listeners.remove(listener)
    }

    /// Returns the currently registered listeners.
    #[must_use]
    pub fn listeners(&self) -> Vec<Arc<dyn ProgressListener>> {
        self.shared.state.lock().listeners.to_vec()
    }

    /// Sets the status to `Canceled` and notifies listeners.
    fn mark_canceled(&self, err: MonitorError) -> MonitorError {
        {
            let mut state = self.shared.state.lock();
            state.body_running = false;
            state.status = TaskStatus::Canceled;
        }
        let progress = self.progress();
        self.shared
            .state
            .lock()
            .listeners
            .fire(|l| l.on_task_canceled(&progress));
        warn!("Task '{}' canceled", progress.task_name);
        err
    }
}

impl Default for ProgressMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProgressMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProMon[{}]", self.task_name())
    }
}

impl fmt::Debug for ProgressMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let root = matches!(self.shared.kind, Kind::Root(_));
        match self.shared.state.try_lock() {
            Some(state) => f
                .debug_struct("ProgressMonitor")
                .field("root", &root)
                .field("task_name", &state.task_name)
                .field("total_work", &state.total_work)
                .field("work_done", &state.work_done)
                .field("status", &state.status)
                .field("active_subtasks", &state.active.len())
                .finish(),
            None => f
                .debug_struct("ProgressMonitor")
                .field("root", &root)
                .finish_non_exhaustive(),
        }
    }
}

impl Shared {
    pub(crate) fn is_canceled(&self) -> bool {
        match &self.kind {
            Kind::Root(flag) => flag.is_set(),
            Kind::Child(link) => link.parent().is_some_and(|p| p.is_canceled()),
        }
    }

    pub(crate) fn cancel(&self) -> Result<()> {
        match &self.kind {
            Kind::Root(flag) => {
                if flag.request()? {
                    debug!("Cancellation requested");
                    self.state.lock().listeners.fire(|l| l.on_cancel_requested());
                }
                Ok(())
            }
            Kind::Child(link) => match link.parent() {
                Some(parent) => parent.cancel(),
                None => Err(MonitorError::InvalidState(
                    "parent monitor no longer exists".to_string(),
                )),
            },
        }
    }

    /// Cancellation checkpoint plus clamped work update.
    ///
    /// Returns the units actually applied. Sub-task monitors forward
    /// their new fraction to the parent before returning, with `state`
    /// still locked.
    fn record_work(&self, state: &mut State, amount: u64) -> Result<u64> {
        if self.is_canceled() {
            return Err(MonitorError::canceled(state.task_name.clone()));
        }
        let applied = amount.min(state.total_work.saturating_sub(state.work_done));
        state.work_done += applied;
        self.forward(state);
        Ok(applied)
    }

    fn forward(&self, state: &State) {
        if let Kind::Child(link) = &self.kind {
            link.forward(state.effective_fraction());
        }
    }

    /// A sub-task reports its cumulative share in this monitor's units.
    pub(crate) fn worked_by_child(&self, id: ChildId, parent_units: f64) {
        let mut state = self.state.lock();
        let Some(child) = state.active.get_mut(&id) else {
            // scope already closed
            return;
        };
        let delta = parent_units - child.reported;
        if delta <= 0.0 {
            return;
        }
        child.reported = parent_units;
        state.listeners.fire(|l| l.on_worked(delta));
        self.forward(&state);
        MutexGuard::unlock_fair(state);
    }

    fn snapshot(&self) -> Progress {
        let (task_name, total_work, work_done, status, completed, children) = {
            let state = self.state.lock();
            let work_done = state.work_done + state.reported_by_children() as u64;
            let children: Vec<Arc<Shared>> = state
                .active
                .values()
                .map(|child| Arc::clone(&child.monitor))
                .collect();
            (
                state.task_name.clone(),
                state.total_work,
                work_done,
                state.status,
                state.completed.clone(),
                children,
            )
        };
        let active = children.iter().map(|child| child.snapshot()).collect();
        Progress::new(task_name, total_work, work_done, status, completed, active)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
