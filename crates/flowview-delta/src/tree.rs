//! Delta applicator for the workflow tree
//!
//! Per batch, strictly in order:
//! 1. Shutdown clears the store
//! 2. An empty store accepts only the initial snapshot; anything else is
//!    alerted and discarded
//! 3. A populated store takes pruned, then added, then updated items, each
//!    item isolated so one failure never blocks the rest
//!
//! Cycle point tallies are recomputed once per batch that carried data.

use crate::alert::{Alert, AlertSink};
use crate::config::SyncConfig;
use crate::error::{
    DeltaError, DeltaPhase, IngestionError, ItemApplicationError, ItemFailure,
    OutOfOrderDeltaError,
};
use flowview_model::{normalize, snapshot_items, task_jobs, Deltas, EntityKind, NodeId};
use flowview_store::{StoreError, WorkflowTree};
use serde_json::Value as JsonValue;

/// What a batch did to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Store cleared by a shutdown batch
    Shutdown,
    /// Batch arrived before the initial snapshot and was dropped
    Discarded,
    /// Initial snapshot ingested
    Initialized,
    /// Pruned/added/updated data applied (possibly with item failures)
    Applied,
    /// Batch carried no data
    Unchanged,
}

/// Result of one batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub outcome: BatchOutcome,
    /// Items applied successfully (updates and prunes of absent ids included)
    pub applied: usize,
    /// Items that failed; already logged and alerted
    pub errors: Vec<ItemApplicationError>,
}

impl BatchReport {
    /// Create report with no item activity
    #[inline]
    #[must_use]
    pub fn new(outcome: BatchOutcome) -> Self {
        Self {
            outcome,
            applied: 0,
            errors: Vec::new(),
        }
    }

    /// Check if any item failed
    #[inline]
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Apply one delta batch to the tree
///
/// # Errors
/// - [`DeltaError::MalformedBatch`] if either argument is absent
/// - [`DeltaError::InitialIngestion`] if the initial snapshot cannot be
///   ingested; the store stays empty
pub fn apply_tree_deltas(
    deltas: Option<&Deltas>,
    tree: Option<&mut WorkflowTree>,
    alerts: &dyn AlertSink,
    config: &SyncConfig,
) -> Result<BatchReport, DeltaError> {
    let deltas = deltas.ok_or(DeltaError::MalformedBatch(
        "subscription did not return delta data",
    ))?;
    let tree = tree.ok_or(DeltaError::MalformedBatch("no workflow store to apply to"))?;

    if deltas.shutdown {
        tree.clear();
        tracing::info!("Workflow shut down, store cleared");
        return Ok(BatchReport::new(BatchOutcome::Shutdown));
    }

    if tree.is_empty() {
        let Some(workflow) = deltas.workflow() else {
            let error = OutOfOrderDeltaError::new(deltas.id.clone());
            tracing::error!("{}", error);
            raise(alerts, config, Alert::out_of_order(error));
            return Ok(BatchReport::new(BatchOutcome::Discarded));
        };

        return match ingest_snapshot(workflow) {
            Ok(fresh) => {
                *tree = fresh;
                tracing::info!(
                    "Initialized workflow {} with {} nodes",
                    tree.workflow().map_or("?", |root| root.id.as_str()),
                    tree.len()
                );
                Ok(BatchReport::new(BatchOutcome::Initialized))
            }
            Err(error) => {
                tracing::error!("Error applying initial data burst: {}", error);
                raise(alerts, config, Alert::initial_ingestion(&error));
                Err(error.into())
            }
        };
    }

    if !deltas.has_changes() {
        tracing::debug!("Batch carried no changes");
        return Ok(BatchReport::new(BatchOutcome::Unchanged));
    }

    let mut report = BatchReport::new(BatchOutcome::Applied);
    apply_changes(deltas, tree, config, &mut report);
    tree.tally_cycle_point_states();

    tracing::debug!(
        "Applied batch: {} items, {} failed",
        report.applied,
        report.errors.len()
    );
    if report.has_errors() {
        raise(alerts, config, Alert::item_failures(report.errors.clone()));
    }
    Ok(report)
}

fn raise(alerts: &dyn AlertSink, config: &SyncConfig, alert: Alert) {
    let alert = if config.reload_hint {
        alert.with_reload_hint()
    } else {
        alert
    };
    alerts.alert(alert);
}

/// Build a fresh store from a snapshot; nothing is swapped in on failure
fn ingest_snapshot(workflow: &JsonValue) -> Result<WorkflowTree, IngestionError> {
    let mut tree = WorkflowTree::new();
    let root = normalize::create_workflow_node(workflow).map_err(IngestionError::Workflow)?;
    tree.set_workflow(root).map_err(IngestionError::Root)?;

    if !normalize::contains_tree_data(workflow) {
        // stopped workflows carry the root only
        tracing::debug!("Snapshot carries no cycle points, families or tasks");
    }

    for kind in [
        EntityKind::CyclePoint,
        EntityKind::FamilyProxy,
        EntityKind::TaskProxy,
    ] {
        for raw in snapshot_items(workflow, kind) {
            add_item(&mut tree, kind, raw).map_err(|source| {
                ItemApplicationError::for_record(DeltaPhase::Initial, kind, raw, source)
            })?;
        }
    }

    for task in snapshot_items(workflow, EntityKind::TaskProxy) {
        let owner = task.get("id").and_then(JsonValue::as_str).map(NodeId::from);
        for raw in task_jobs(task) {
            add_nested_job(&mut tree, raw, owner.as_ref()).map_err(|source| {
                ItemApplicationError::for_record(DeltaPhase::Initial, EntityKind::Job, raw, source)
            })?;
        }
    }

    tree.tally_cycle_point_states();
    Ok(tree)
}

fn apply_changes(
    deltas: &Deltas,
    tree: &mut WorkflowTree,
    config: &SyncConfig,
    report: &mut BatchReport,
) {
    if let Some(pruned) = &deltas.pruned {
        for kind in EntityKind::PRUNE_ORDER {
            for id in pruned.ids(kind) {
                match prune_item(tree, kind, id) {
                    Ok(_) => report.applied += 1,
                    Err(source) => report.errors.push(failed(
                        ItemApplicationError::for_id(DeltaPhase::Pruned, kind, id, source),
                        None,
                        config,
                    )),
                }
            }
        }
    }

    if let Some(added) = &deltas.added {
        for kind in EntityKind::ADD_ORDER {
            for raw in added.items(kind) {
                match add_item(tree, kind, raw) {
                    Ok(()) => report.applied += 1,
                    Err(source) => report.errors.push(failed(
                        ItemApplicationError::for_record(DeltaPhase::Added, kind, raw, source),
                        Some(raw),
                        config,
                    )),
                }
            }
        }
    }

    if let Some(updated) = &deltas.updated {
        for kind in EntityKind::UPDATE_ORDER {
            for raw in updated.items(kind) {
                match update_item(tree, kind, raw) {
                    Ok(found) => {
                        if !found {
                            tracing::trace!("Update for unknown {} ignored", kind);
                        }
                        report.applied += 1;
                    }
                    Err(source) => report.errors.push(failed(
                        ItemApplicationError::for_record(DeltaPhase::Updated, kind, raw, source),
                        Some(raw),
                        config,
                    )),
                }
            }
        }
    }
}

fn failed(
    error: ItemApplicationError,
    raw: Option<&JsonValue>,
    config: &SyncConfig,
) -> ItemApplicationError {
    match raw {
        Some(raw) if config.log_item_payloads => tracing::warn!(
            "Error applying {}-delta, continuing with the remaining data: {} ({})",
            error.phase,
            error,
            raw
        ),
        _ => tracing::warn!(
            "Error applying {}-delta, continuing with the remaining data: {}",
            error.phase,
            error
        ),
    }
    error
}

fn add_item(tree: &mut WorkflowTree, kind: EntityKind, raw: &JsonValue) -> Result<(), ItemFailure> {
    match kind {
        EntityKind::CyclePoint => tree.add_cycle_point(normalize::create_cycle_point_node(raw)?)?,
        EntityKind::FamilyProxy => {
            tree.add_family_proxy(normalize::create_family_proxy_node(raw)?)?;
        }
        EntityKind::TaskProxy => tree.add_task_proxy(normalize::create_task_proxy_node(raw)?)?,
        EntityKind::Job => tree.add_job(normalize::create_job_node(raw)?)?,
    }
    Ok(())
}

/// Snapshot jobs may leave their owner implicit
fn add_nested_job(
    tree: &mut WorkflowTree,
    raw: &JsonValue,
    owner: Option<&NodeId>,
) -> Result<(), ItemFailure> {
    let mut job = normalize::create_job_node(raw)?;
    if job.first_parent.is_none() {
        job.first_parent = owner.cloned();
    }
    tree.add_job(job)?;
    Ok(())
}

fn update_item(
    tree: &mut WorkflowTree,
    kind: EntityKind,
    raw: &JsonValue,
) -> Result<bool, ItemFailure> {
    let found = match kind {
        // no updates for cycle points; their state is derived
        EntityKind::CyclePoint => false,
        EntityKind::FamilyProxy => {
            tree.update_family_proxy(normalize::create_family_proxy_node(raw)?)?
        }
        EntityKind::TaskProxy => tree.update_task_proxy(normalize::create_task_proxy_node(raw)?)?,
        EntityKind::Job => tree.update_job(normalize::create_job_node(raw)?)?,
    };
    Ok(found)
}

fn prune_item(tree: &mut WorkflowTree, kind: EntityKind, id: &str) -> Result<bool, StoreError> {
    match kind {
        EntityKind::Job => tree.remove_job(id),
        EntityKind::TaskProxy => tree.remove_task_proxy(id),
        // a cycle point goes with its root family
        EntityKind::FamilyProxy | EntityKind::CyclePoint => tree.remove_family_proxy(id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::MockAlertSink;
    use flowview_model::{DeltasAdded, DeltasPruned, DeltasUpdated, TaskState};
    use flowview_store::TreeNode;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn snapshot() -> JsonValue {
        json!({
            "id": "u|wf",
            "name": "wf",
            "status": "running",
            "cyclePoints": [{"id": "u|wf|1", "cyclePoint": "1"}],
            "familyProxies": [
                {"id": "u|wf|1|FAM", "name": "FAM", "cyclePoint": "1",
                 "firstParent": {"id": "u|wf|1|root", "name": "root"}}
            ],
            "taskProxies": [
                {"id": "u|wf|1|a", "name": "a", "cyclePoint": "1", "state": "running",
                 "firstParent": {"id": "u|wf|1|FAM", "name": "FAM"},
                 "jobs": [{"id": "u|wf|1|a|1", "submitNum": 1, "state": "running"}]},
                {"id": "u|wf|1|b", "name": "b", "cyclePoint": "1", "state": "waiting",
                 "firstParent": {"id": "u|wf|1|root", "name": "root"}}
            ]
        })
    }

    fn silent() -> MockAlertSink {
        let mut sink = MockAlertSink::new();
        sink.expect_alert().never();
        sink
    }

    fn initialized() -> WorkflowTree {
        let mut tree = WorkflowTree::new();
        let report = apply_tree_deltas(
            Some(&Deltas::initial(snapshot())),
            Some(&mut tree),
            &silent(),
            &SyncConfig::default(),
        )
        .unwrap();
        assert_eq!(report.outcome, BatchOutcome::Initialized);
        tree
    }

    #[test]
    fn missing_inputs_are_fatal() {
        let sink = silent();
        let config = SyncConfig::default();
        let mut tree = WorkflowTree::new();

        let err = apply_tree_deltas(None, Some(&mut tree), &sink, &config).unwrap_err();
        assert!(matches!(err, DeltaError::MalformedBatch(_)));

        let err = apply_tree_deltas(Some(&Deltas::default()), None, &sink, &config).unwrap_err();
        assert!(matches!(err, DeltaError::MalformedBatch(_)));
    }

    #[test]
    fn initial_snapshot_builds_tree() {
        let tree = initialized();

        assert_eq!(tree.workflow().map(|w| w.id.as_str()), Some("u|wf"));
        assert_eq!(tree.count(EntityKind::CyclePoint), 1);
        assert_eq!(tree.count(EntityKind::FamilyProxy), 1);
        assert_eq!(tree.count(EntityKind::TaskProxy), 2);
        assert_eq!(tree.count(EntityKind::Job), 1);
        assert_eq!(tree.parent("u|wf|1|a|1").map(NodeId::as_str), Some("u|wf|1|a"));

        let point = tree.cycle_point_for("1").unwrap();
        assert_eq!(point.task_count(), 2);
        assert_eq!(point.state, Some(TaskState::Running));
    }

    #[test]
    fn snapshot_without_tree_data_sets_root_only() {
        let mut tree = WorkflowTree::new();
        let report = apply_tree_deltas(
            Some(&Deltas::initial(json!({"id": "u|stopped", "status": "stopped"}))),
            Some(&mut tree),
            &silent(),
            &SyncConfig::default(),
        )
        .unwrap();

        assert_eq!(report.outcome, BatchOutcome::Initialized);
        assert!(!tree.is_empty());
        assert_eq!(tree.len(), 0);
    }

    #[test]
    fn out_of_order_batch_discarded_with_alert() {
        let mut sink = MockAlertSink::new();
        sink.expect_alert()
            .withf(|alert| alert.message.contains("before the workflow initial data burst"))
            .times(1)
            .return_const(());

        let mut tree = WorkflowTree::new();
        let deltas = Deltas {
            updated: Some(DeltasUpdated {
                task_proxies: Some(vec![json!({"id": "u|wf|1|a"})]),
                ..DeltasUpdated::default()
            }),
            ..Deltas::default()
        };

        let report =
            apply_tree_deltas(Some(&deltas), Some(&mut tree), &sink, &SyncConfig::default())
                .unwrap();
        assert_eq!(report.outcome, BatchOutcome::Discarded);
        assert!(tree.is_empty());
    }

    #[test]
    fn failed_ingestion_leaves_store_empty() {
        let mut sink = MockAlertSink::new();
        sink.expect_alert().times(1).return_const(());

        let mut snapshot = snapshot();
        snapshot["taskProxies"][1]["state"] = json!("bogus");

        let mut tree = WorkflowTree::new();
        let err = apply_tree_deltas(
            Some(&Deltas::initial(snapshot)),
            Some(&mut tree),
            &sink,
            &SyncConfig::default(),
        )
        .unwrap_err();

        assert!(matches!(err, DeltaError::InitialIngestion(IngestionError::Item(_))));
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
    }

    #[test]
    fn shutdown_clears_whatever_else_is_present() {
        let mut tree = initialized();
        let deltas = Deltas {
            shutdown: true,
            ..Deltas::initial(snapshot())
        };

        let report =
            apply_tree_deltas(Some(&deltas), Some(&mut tree), &silent(), &SyncConfig::default())
                .unwrap();
        assert_eq!(report.outcome, BatchOutcome::Shutdown);
        assert!(tree.is_empty());
    }

    #[test]
    fn phases_apply_in_order() {
        let mut tree = initialized();
        // prune runs before add, so the re-added task survives with its new state
        let deltas = Deltas {
            pruned: Some(DeltasPruned {
                task_proxies: Some(vec!["u|wf|1|b".to_string()]),
                ..DeltasPruned::default()
            }),
            added: Some(DeltasAdded {
                task_proxies: Some(vec![json!({
                    "id": "u|wf|1|b", "cyclePoint": "1", "state": "submitted"
                })]),
                ..DeltasAdded::default()
            }),
            updated: Some(DeltasUpdated {
                task_proxies: Some(vec![json!({"id": "u|wf|1|b", "state": "running"})]),
                ..DeltasUpdated::default()
            }),
            ..Deltas::default()
        };

        let report =
            apply_tree_deltas(Some(&deltas), Some(&mut tree), &silent(), &SyncConfig::default())
                .unwrap();

        assert_eq!(report.outcome, BatchOutcome::Applied);
        assert_eq!(report.applied, 3);
        let task = tree.get("u|wf|1|b").and_then(TreeNode::as_task_proxy).unwrap();
        assert_eq!(task.state, Some(TaskState::Running));
        let point = tree.cycle_point_for("1").unwrap();
        assert_eq!(point.state_totals.get(&TaskState::Running), Some(&2));
    }

    #[test]
    fn item_failures_alerted_once() {
        let mut sink = MockAlertSink::new();
        sink.expect_alert()
            .withf(|alert| alert.errors.len() == 2)
            .times(1)
            .return_const(());

        let mut tree = initialized();
        let deltas = Deltas {
            added: Some(DeltasAdded {
                jobs: Some(vec![
                    json!({"id": "u|wf|1|a|2", "firstParent": {"id": "u|wf|1|a"}, "submitNum": 2}),
                    json!({"id": "u|wf|1|x|1", "firstParent": {"id": "u|wf|1|x"}}),
                    json!({"firstParent": {"id": "u|wf|1|a"}}),
                ]),
                ..DeltasAdded::default()
            }),
            ..Deltas::default()
        };

        let report =
            apply_tree_deltas(Some(&deltas), Some(&mut tree), &sink, &SyncConfig::default())
                .unwrap();

        assert_eq!(report.applied, 1);
        assert_eq!(report.errors.len(), 2);
        assert!(tree.contains("u|wf|1|a|2"));
        assert_eq!(report.errors[0].id.as_deref(), Some("u|wf|1|x|1"));
        assert_eq!(report.errors[1].id, None);
    }

    #[test]
    fn empty_batch_is_unchanged() {
        let mut tree = initialized();
        let report = apply_tree_deltas(
            Some(&Deltas::default()),
            Some(&mut tree),
            &silent(),
            &SyncConfig::default(),
        )
        .unwrap();
        assert_eq!(report.outcome, BatchOutcome::Unchanged);
    }
}
