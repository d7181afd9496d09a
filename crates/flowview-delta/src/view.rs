//! Tree, table and observers behind one entry point

use crate::alert::{AlertSink, TracingAlertSink};
use crate::config::SyncConfig;
use crate::error::DeltaError;
use crate::observer::{ChangeObserver, ObserverId, ViewEvent};
use crate::table::TaskTable;
use crate::tree::{apply_tree_deltas, BatchOutcome, BatchReport};
use flowview_model::Deltas;
use flowview_store::WorkflowTree;
use std::fmt;

/// Client-side state of one observed workflow
///
/// Owns the tree, the optional flat table, the alert sink and the observers.
/// Batches go through [`apply`](Self::apply) one at a time.
pub struct WorkflowView {
    tree: WorkflowTree,
    table: Option<TaskTable>,
    alerts: Box<dyn AlertSink>,
    observers: Vec<(ObserverId, Box<dyn ChangeObserver>)>,
    next_observer: u64,
    config: SyncConfig,
}

impl WorkflowView {
    /// Create empty view
    #[must_use]
    pub fn new(config: SyncConfig, alerts: Box<dyn AlertSink>) -> Self {
        Self {
            tree: WorkflowTree::new(),
            table: config.maintain_table.then(TaskTable::new),
            alerts,
            observers: Vec::new(),
            next_observer: 0,
            config,
        }
    }

    /// Hierarchical store
    #[inline]
    #[must_use]
    pub fn tree(&self) -> &WorkflowTree {
        &self.tree
    }

    /// Flat table, when maintained
    #[inline]
    #[must_use]
    pub fn table(&self) -> Option<&TaskTable> {
        self.table.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Register an observer
    pub fn subscribe(&mut self, observer: impl ChangeObserver + 'static) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push((id, Box::new(observer)));
        tracing::debug!("Registered {}", id);
        id
    }

    /// Remove an observer; returns `false` if it was not registered
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(registered, _)| *registered != id);
        self.observers.len() != before
    }

    /// Apply one batch to the tree, then the table, then notify observers
    ///
    /// # Errors
    /// Returns the tree applicator's fatal errors; the table and observers
    /// are left untouched in that case
    pub fn apply(&mut self, deltas: Option<&Deltas>) -> Result<BatchReport, DeltaError> {
        let report = apply_tree_deltas(
            deltas,
            Some(&mut self.tree),
            &*self.alerts,
            &self.config,
        )?;

        if let (Some(table), Some(deltas)) = (self.table.as_mut(), deltas) {
            sync_table(table, deltas, report.outcome);
        }

        let event = match report.outcome {
            BatchOutcome::Shutdown => Some(ViewEvent::Cleared),
            BatchOutcome::Initialized => Some(ViewEvent::Initialized),
            BatchOutcome::Applied => Some(ViewEvent::Changed),
            BatchOutcome::Discarded => Some(ViewEvent::Discarded),
            BatchOutcome::Unchanged => None,
        };
        if let Some(event) = event {
            self.notify(event);
        }
        Ok(report)
    }

    fn notify(&mut self, event: ViewEvent) {
        for (_, observer) in &mut self.observers {
            observer.on_change(event, &self.tree, self.table.as_ref());
        }
    }
}

/// Mirror into the table exactly what the tree took from the batch
fn sync_table(table: &mut TaskTable, deltas: &Deltas, outcome: BatchOutcome) {
    match outcome {
        BatchOutcome::Shutdown => table.clear(),
        BatchOutcome::Initialized => {
            if let Some(workflow) = deltas.workflow() {
                table.seed(workflow);
            }
        }
        BatchOutcome::Applied | BatchOutcome::Unchanged => {
            table.apply_changes(deltas);
        }
        BatchOutcome::Discarded => {}
    }
}

impl Default for WorkflowView {
    fn default() -> Self {
        Self::new(SyncConfig::default(), Box::new(TracingAlertSink))
    }
}

impl fmt::Debug for WorkflowView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowView")
            .field("tree", &self.tree)
            .field("table", &self.table)
            .field("observers", &self.observers.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
