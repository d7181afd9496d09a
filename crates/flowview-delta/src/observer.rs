//! Change notification for render layers

use crate::table::TaskTable;
use flowview_store::WorkflowTree;
use std::fmt;

/// What happened to the view in the last batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewEvent {
    /// Workflow shut down; everything dropped
    Cleared,
    /// Initial snapshot ingested
    Initialized,
    /// Incremental changes applied
    Changed,
    /// Batch arrived before the snapshot and was ignored
    Discarded,
}

/// Handle returned by [`WorkflowView::subscribe`](crate::WorkflowView::subscribe)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub(crate) u64);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer-{}", self.0)
    }
}

/// Receives one event per completed batch
///
/// Called after the batch is fully applied, so the tree and table are
/// consistent with each other.
pub trait ChangeObserver: Send {
    /// Handle one event; `table` is `None` when the table is disabled
    fn on_change(&mut self, event: ViewEvent, tree: &WorkflowTree, table: Option<&TaskTable>);
}

impl<F> ChangeObserver for F
where
    F: FnMut(ViewEvent, &WorkflowTree, Option<&TaskTable>) + Send,
{
    fn on_change(&mut self, event: ViewEvent, tree: &WorkflowTree, table: Option<&TaskTable>) {
        self(event, tree, table);
    }
}
