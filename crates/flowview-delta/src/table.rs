//! Flat task table
//!
//! Task id -> row (task plus its jobs), kept in step with the same delta
//! batches as the tree but with looser rules: adds are first-write-wins,
//! records that cannot be placed are dropped quietly, and an update for an
//! unseen job creates it.

use flowview_model::{
    normalize, snapshot_items, task_jobs, Deltas, EntityKind, JobNode, Merge, NodeId,
    NormalizeError, TaskProxyNode,
};
use indexmap::IndexMap;
use serde_json::Value as JsonValue;

/// One task with its jobs
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub task: TaskProxyNode,
    /// Jobs in arrival order
    pub jobs: Vec<JobNode>,
}

impl TableRow {
    fn new(task: TaskProxyNode) -> Self {
        Self {
            task,
            jobs: Vec::new(),
        }
    }

    /// Job by id
    #[must_use]
    pub fn job(&self, id: &str) -> Option<&JobNode> {
        self.jobs.iter().find(|job| job.id.as_str() == id)
    }
}

/// Counts from one [`TaskTable::apply`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableChanges {
    /// Records that changed the table
    pub applied: usize,
    /// Records dropped (duplicate, unplaceable or malformed)
    pub skipped: usize,
}

impl TableChanges {
    fn record(&mut self, changed: bool) {
        if changed {
            self.applied += 1;
        } else {
            self.skipped += 1;
        }
    }
}

/// Flat index of tasks
#[derive(Debug, Clone, Default)]
pub struct TaskTable {
    rows: IndexMap<NodeId, TableRow>,
}

impl TaskTable {
    /// Create empty table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of task rows
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if no task rows
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row by task id
    #[inline]
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&TableRow> {
        self.rows.get(id)
    }

    /// Check if a task row exists
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.rows.contains_key(id)
    }

    /// Rows in insertion order
    pub fn rows(&self) -> impl Iterator<Item = &TableRow> + '_ {
        self.rows.values()
    }

    /// Drop every row
    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Apply one batch on its own
    ///
    /// A shutdown batch clears the table. A batch carrying a workflow
    /// snapshot replaces the table with the snapshot's tasks and nested
    /// jobs; its other lists are ignored, as the tree ignores them. Any
    /// other batch goes through [`apply_changes`](Self::apply_changes).
    pub fn apply(&mut self, deltas: &Deltas) -> TableChanges {
        if deltas.shutdown {
            self.clear();
            return TableChanges::default();
        }
        match deltas.workflow() {
            Some(workflow) => self.seed(workflow),
            None => self.apply_changes(deltas),
        }
    }

    /// Replace every row with the tasks of a workflow snapshot
    pub fn seed(&mut self, workflow: &JsonValue) -> TableChanges {
        let mut changes = TableChanges::default();
        self.clear();
        for task in snapshot_items(workflow, EntityKind::TaskProxy) {
            changes.record(self.add_task(task));
            let owner = task.get("id").and_then(JsonValue::as_str).map(NodeId::from);
            for job in task_jobs(task) {
                changes.record(self.add_job(job, owner.as_ref()));
            }
        }
        tracing::debug!("Table seeded with {} rows", self.rows.len());
        changes
    }

    /// Apply the added, updated and pruned lists, in that order
    ///
    /// A snapshot carried by the batch is not read here.
    pub fn apply_changes(&mut self, deltas: &Deltas) -> TableChanges {
        let mut changes = TableChanges::default();

        if let Some(added) = &deltas.added {
            for task in added.items(EntityKind::TaskProxy) {
                changes.record(self.add_task(task));
            }
            for job in added.items(EntityKind::Job) {
                changes.record(self.add_job(job, None));
            }
        }

        if let Some(updated) = &deltas.updated {
            for task in updated.items(EntityKind::TaskProxy) {
                changes.record(self.update_task(task));
            }
            for job in updated.items(EntityKind::Job) {
                changes.record(self.update_job(job));
            }
        }

        if let Some(pruned) = &deltas.pruned {
            for id in pruned.ids(EntityKind::TaskProxy) {
                changes.record(self.prune_task(id));
            }
        }

        tracing::debug!(
            "Table batch: {} applied, {} skipped, {} rows",
            changes.applied,
            changes.skipped,
            self.rows.len()
        );
        changes
    }

    /// Insert a task unless its id is already present
    fn add_task(&mut self, raw: &JsonValue) -> bool {
        let Some(task) = normalized(normalize::create_task_proxy_node(raw), raw) else {
            return false;
        };
        if self.rows.contains_key(&task.id) {
            return false;
        }
        self.rows.insert(task.id.clone(), TableRow::new(task));
        true
    }

    /// Append a job to its task's row; no row, no job
    fn add_job(&mut self, raw: &JsonValue, fallback_owner: Option<&NodeId>) -> bool {
        let Some(owner) = normalize::first_parent_id(raw).or_else(|| fallback_owner.cloned())
        else {
            tracing::debug!("Table job add without owner skipped: {}", raw);
            return false;
        };
        let Some(row) = self.rows.get_mut(&owner) else {
            return false;
        };
        let Some(job) = normalized(normalize::create_job_node(raw), raw) else {
            return false;
        };
        row.jobs.push(job);
        true
    }

    /// Deep-merge into an existing row
    fn update_task(&mut self, raw: &JsonValue) -> bool {
        let Some(task) = normalized(normalize::create_task_proxy_node(raw), raw) else {
            return false;
        };
        match self.rows.get_mut(&task.id) {
            Some(row) => {
                row.task.merge_from(task);
                true
            }
            None => false,
        }
    }

    /// Merge into the job if the row has it, otherwise append it
    fn update_job(&mut self, raw: &JsonValue) -> bool {
        let Some(owner) = normalize::first_parent_id(raw) else {
            tracing::debug!("Table job update without owner skipped: {}", raw);
            return false;
        };
        let Some(row) = self.rows.get_mut(&owner) else {
            tracing::debug!("Table job update for unknown task {} skipped", owner);
            return false;
        };
        let Some(job) = normalized(normalize::create_job_node(raw), raw) else {
            return false;
        };
        match row.jobs.iter_mut().find(|existing| existing.id == job.id) {
            Some(existing) => existing.merge_from(job),
            None => row.jobs.push(job),
        }
        true
    }

    fn prune_task(&mut self, id: &str) -> bool {
        self.rows.shift_remove(id).is_some()
    }
}

fn normalized<T>(result: Result<T, NormalizeError>, raw: &JsonValue) -> Option<T> {
    match result {
        Ok(node) => Some(node),
        Err(error) => {
            tracing::debug!("Table record skipped ({}): {}", error, raw);
            None
        }
    }
}
