//! Flowview Delta
//!
//! Applies streamed delta batches to a [`WorkflowTree`](flowview_store::WorkflowTree)
//! and a flat [`TaskTable`], isolating per-item failures so a bad record
//! never corrupts what was already applied.
//!
//! # Core Concepts
//!
//! - [`apply_tree_deltas`]: Shutdown, initial snapshot, then pruned/added/updated
//! - [`TaskTable`]: Flat task index with first-write-wins adds
//! - [`WorkflowView`]: Tree, table, alert sink and observers in one place
//! - [`drive`]: Feed an async stream of batches into a view
//! - [`AlertSink`]: Injected receiver of user-facing alerts
//! - [`SyncConfig`]: TOML-loadable settings
//!
//! # Example
//!
//! ```rust,ignore
//! use flowview_delta::{drive, SyncConfig, TracingAlertSink, WorkflowView};
//!
//! let mut view = WorkflowView::new(SyncConfig::load("flowview.toml")?, Box::new(TracingAlertSink));
//! let summary = drive(&mut view, batches).await?;
//! println!("{} batches, {} item errors", summary.batches, summary.item_errors);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod alert;
mod config;
mod error;
mod observer;
mod subscription;
mod table;
mod tree;
mod view;

pub use alert::{Alert, AlertSink, TracingAlertSink};
pub use config::SyncConfig;
pub use error::{
    ApplicationError, ConfigError, DeltaError, DeltaPhase, IngestionError, ItemApplicationError,
    ItemFailure, OutOfOrderDeltaError,
};
pub use observer::{ChangeObserver, ObserverId, ViewEvent};
pub use subscription::{drive, DriveSummary};
pub use table::{TableChanges, TableRow, TaskTable};
pub use tree::{apply_tree_deltas, BatchOutcome, BatchReport};
pub use view::WorkflowView;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use flowview_model::{Deltas, TaskState};
    use serde_json::json;

    #[test]
    fn table_and_tree_agree_after_updates() {
        let mut view = WorkflowView::default();
        view.apply(Some(&Deltas::initial(json!({
            "id": "u|wf",
            "cyclePoints": [{"id": "u|wf|1", "cyclePoint": "1"}],
            "taskProxies": [{"id": "u|wf|1|a", "cyclePoint": "1", "state": "waiting"}]
        }))))
        .unwrap();

        let update: Deltas = serde_json::from_value(json!({
            "updated": {"taskProxies": [{"id": "u|wf|1|a", "state": "succeeded"}]}
        }))
        .unwrap();
        view.apply(Some(&update)).unwrap();

        let tree_state = view
            .tree()
            .get("u|wf|1|a")
            .and_then(flowview_store::TreeNode::as_task_proxy)
            .and_then(|task| task.state);
        let table_state = view
            .table()
            .and_then(|table| table.get("u|wf|1|a"))
            .and_then(|row| row.task.state);

        assert_eq!(tree_state, Some(TaskState::Succeeded));
        assert_eq!(tree_state, table_state);
    }
}
