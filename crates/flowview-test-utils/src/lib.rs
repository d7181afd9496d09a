//! Testing utilities for the flowview workspace
//!
//! Snapshot fixtures, delta batch builders and a recording alert sink.

#![allow(missing_docs)]

use flowview_delta::{Alert, AlertSink};
use flowview_model::{Deltas, DeltasAdded, DeltasPruned, DeltasUpdated};
use parking_lot::Mutex;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;

pub const WORKFLOW_ID: &str = "user|flow";

/// Generated initial snapshot with known ids
///
/// Families are spread round-robin over cycle points. With families present,
/// task `t` sits in family `t % families` (and that family's cycle point);
/// otherwise directly under cycle point `t % cycle_points`.
#[derive(Debug, Clone)]
pub struct SnapshotFixture {
    pub workflow: JsonValue,
    pub cycle_point_ids: Vec<String>,
    pub family_ids: Vec<String>,
    pub task_ids: Vec<String>,
    pub job_ids: Vec<String>,
}

impl SnapshotFixture {
    /// Build a snapshot; `cycle_points` must be at least 1
    pub fn new(cycle_points: usize, families: usize, tasks: usize, jobs_per_task: usize) -> Self {
        assert!(cycle_points > 0, "a snapshot needs at least one cycle point");

        let points: Vec<JsonValue> = (0..cycle_points)
            .map(|p| json!({"id": cycle_point_id(p), "cyclePoint": p.to_string()}))
            .collect();

        let family_point = |f: usize| f % cycle_points;
        let family_records: Vec<JsonValue> = (0..families)
            .map(|f| {
                let p = family_point(f);
                json!({
                    "id": family_id(p, f),
                    "name": format!("FAM{f}"),
                    "cyclePoint": p.to_string(),
                    "state": "waiting",
                    "firstParent": {"id": format!("{}|root", cycle_point_id(p)), "name": "root"}
                })
            })
            .collect();

        let mut task_records = Vec::with_capacity(tasks);
        let mut task_ids = Vec::with_capacity(tasks);
        let mut job_ids = Vec::with_capacity(tasks * jobs_per_task);
        for t in 0..tasks {
            let (p, parent) = if families > 0 {
                let f = t % families;
                (family_point(f), json!({"id": family_id(family_point(f), f), "name": format!("FAM{f}")}))
            } else {
                let p = t % cycle_points;
                (p, json!({"id": format!("{}|root", cycle_point_id(p)), "name": "root"}))
            };
            let id = task_id(p, t);
            let jobs: Vec<JsonValue> = (1..=jobs_per_task)
                .map(|j| {
                    job_ids.push(job_id(&id, j));
                    json!({
                        "id": job_id(&id, j),
                        "submitNum": j,
                        "state": "succeeded",
                        "firstParent": {"id": id}
                    })
                })
                .collect();
            task_records.push(json!({
                "id": id,
                "name": format!("task{t}"),
                "cyclePoint": p.to_string(),
                "state": "running",
                "firstParent": parent,
                "jobs": jobs
            }));
            task_ids.push(id);
        }

        Self {
            workflow: json!({
                "id": WORKFLOW_ID,
                "name": "flow",
                "status": "running",
                "cyclePoints": points,
                "familyProxies": family_records,
                "taskProxies": task_records
            }),
            cycle_point_ids: (0..cycle_points).map(cycle_point_id).collect(),
            family_ids: (0..families).map(|f| family_id(family_point(f), f)).collect(),
            task_ids,
            job_ids,
        }
    }

    /// Initial batch carrying this snapshot
    pub fn deltas(&self) -> Deltas {
        Deltas::initial(self.workflow.clone())
    }

    /// Number of non-root entities the snapshot should index
    pub fn entity_count(&self) -> usize {
        self.cycle_point_ids.len() + self.family_ids.len() + self.task_ids.len() + self.job_ids.len()
    }
}

pub fn cycle_point_id(point: usize) -> String {
    format!("{WORKFLOW_ID}|{point}")
}

pub fn family_id(point: usize, family: usize) -> String {
    format!("{WORKFLOW_ID}|{point}|FAM{family}")
}

pub fn task_id(point: usize, task: usize) -> String {
    format!("{WORKFLOW_ID}|{point}|task{task}")
}

pub fn job_id(task_id: &str, submit_num: usize) -> String {
    format!("{task_id}|{submit_num:02}")
}

/// Raw task record in cycle point `point`
pub fn task_record(id: &str, point: usize, state: &str) -> JsonValue {
    json!({"id": id, "name": id, "cyclePoint": point.to_string(), "state": state})
}

/// Raw job record owned by `task_id`
pub fn job_record(id: &str, task_id: &str, submit_num: usize) -> JsonValue {
    json!({
        "id": id,
        "firstParent": {"id": task_id},
        "submitNum": submit_num,
        "state": "submitted"
    })
}

pub fn added_tasks(tasks: Vec<JsonValue>) -> Deltas {
    Deltas {
        added: Some(DeltasAdded {
            task_proxies: Some(tasks),
            ..DeltasAdded::default()
        }),
        ..Deltas::default()
    }
}

pub fn added_jobs(jobs: Vec<JsonValue>) -> Deltas {
    Deltas {
        added: Some(DeltasAdded {
            jobs: Some(jobs),
            ..DeltasAdded::default()
        }),
        ..Deltas::default()
    }
}

pub fn updated_tasks(tasks: Vec<JsonValue>) -> Deltas {
    Deltas {
        updated: Some(DeltasUpdated {
            task_proxies: Some(tasks),
            ..DeltasUpdated::default()
        }),
        ..Deltas::default()
    }
}

pub fn updated_jobs(jobs: Vec<JsonValue>) -> Deltas {
    Deltas {
        updated: Some(DeltasUpdated {
            jobs: Some(jobs),
            ..DeltasUpdated::default()
        }),
        ..Deltas::default()
    }
}

pub fn pruned_tasks(ids: &[&str]) -> Deltas {
    Deltas {
        pruned: Some(DeltasPruned {
            task_proxies: Some(ids.iter().map(ToString::to_string).collect()),
            ..DeltasPruned::default()
        }),
        ..Deltas::default()
    }
}

/// Alert sink that keeps every alert; clones share the same record
#[derive(Debug, Clone, Default)]
pub struct RecordingAlertSink {
    alerts: Arc<Mutex<Vec<Alert>>>,
}

impl RecordingAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.alerts.lock().len()
    }
}

impl AlertSink for RecordingAlertSink {
    fn alert(&self, alert: Alert) {
        self.alerts.lock().push(alert);
    }
}
