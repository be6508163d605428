//! Back-reference from a sub-task monitor to its parent.
//!
//! A child owns a portion (`allocated`) of its parent's budget and maps
//! its own completion fraction onto it:
//!
//! ```text
//! parent units = allocated * (child effective work / child total work)
//! ```
//!
//! The link is non-owning. The parent holds the child only while the
//! sub-task scope is open, so the pair never forms a reference cycle.

use crate::monitor::{ChildId, Shared};
use std::sync::{Arc, Weak};

/// Non-owning handle from a child monitor to its parent.
#[derive(Debug)]
pub(crate) struct ParentLink {
    parent: Weak<Shared>,
    id: ChildId,
    allocated: u64,
}

impl ParentLink {
    pub(crate) fn new(parent: &Arc<Shared>, id: ChildId, allocated: u64) -> Self {
        Self {
            parent: Arc::downgrade(parent),
            id,
            allocated,
        }
    }

    /// The parent, unless it has already been dropped.
    #[inline]
    pub(crate) fn parent(&self) -> Option<Arc<Shared>> {
        self.parent.upgrade()
    }

    /// Parent units represented by `fraction` of this child's work.
    #[inline]
    pub(crate) fn scale(&self, fraction: f64) -> f64 {
        self.allocated as f64 * fraction.clamp(0.0, 1.0)
    }

    /// Reports the child's cumulative completion fraction to the parent.
    ///
    /// Must be called with the child's lock held; takes the parent's.
    pub(crate) fn forward(&self, fraction: f64) {
        if let Some(parent) = self.parent() {
            parent.worked_by_child(self.id, self.scale(fraction));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProgressMonitor;

    #[test]
    fn test_scale_maps_fraction_onto_allocation() {
        let root = ProgressMonitor::new();
        let link = ParentLink::new(root.shared(), 0, 10);

        assert_eq!(link.scale(0.0), 0.0);
        assert_eq!(link.scale(0.5), 5.0);
        assert_eq!(link.scale(1.0), 10.0);
    }

    #[test]
    fn test_scale_never_exceeds_allocation() {
        let root = ProgressMonitor::new();
        let link = ParentLink::new(root.shared(), 0, 4);
        assert_eq!(link.scale(1.2), 4.0);
    }

    #[test]
    fn test_dropped_parent_is_not_reachable() {
        let root = ProgressMonitor::new();
        let link = ParentLink::new(root.shared(), 0, 4);
        assert!(link.parent().is_some());

        drop(root);
        assert!(link.parent().is_none());
        // forwarding to a dropped parent is a no-op
        link.forward(0.5);
    }
}
