//! Root-owned cancellation flag.
//!
//! The flag lives only at the root of a monitor tree. Every child
//! queries it transitively through its parent chain, so a request is
//! visible at every checkpoint in the tree as soon as it is set.

use crate::error::{MonitorError, Result};
use std::sync::atomic::{AtomicBool, Ordering};

/// One-shot cancellation flag with a cancelability policy.
#[derive(Debug)]
pub(crate) struct CancelFlag {
    allow_cancellation: bool,
    requested: AtomicBool,
}

impl CancelFlag {
    pub(crate) const fn new(allow_cancellation: bool) -> Self {
        Self {
            allow_cancellation,
            requested: AtomicBool::new(false),
        }
    }

    /// Requests cancellation.
    ///
    /// Returns `Ok(true)` for the one call that set the flag and
    /// `Ok(false)` for every later call.
    ///
    /// # Errors
    ///
    /// [`MonitorError::NotCancelable`] if cancellation is disabled; the
    /// flag is left untouched.
    pub(crate) fn request(&self) -> Result<bool> {
        if !self.allow_cancellation {
            return Err(MonitorError::NotCancelable);
        }
        Ok(self
            .requested
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok())
    }

    #[inline]
    pub(crate) fn is_set(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }
}
