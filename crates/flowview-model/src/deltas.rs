//! Delta batch payloads
//!
//! Shapes of the batches delivered by the transport. Entity records stay raw
//! JSON until a normalizer turns them into nodes, so one malformed record
//! never fails the whole batch at parse time.

use crate::kind::EntityKind;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// One delta batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deltas {
    /// Upstream batch id (usually the workflow id)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Workflow stopped; everything else in the batch is ignored
    #[serde(default)]
    pub shutdown: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added: Option<DeltasAdded>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DeltasUpdated>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pruned: Option<DeltasPruned>,
}

/// Added records, plus the full snapshot on the first batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeltasAdded {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_points: Option<Vec<JsonValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_proxies: Option<Vec<JsonValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_proxies: Option<Vec<JsonValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<Vec<JsonValue>>,
}

/// Partial records for existing entities
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeltasUpdated {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_proxies: Option<Vec<JsonValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_proxies: Option<Vec<JsonValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<Vec<JsonValue>>,
}

/// Ids of removed entities
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeltasPruned {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_proxies: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_proxies: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<Vec<String>>,
}

impl Deltas {
    /// Shutdown batch
    #[inline]
    #[must_use]
    pub fn shutdown() -> Self {
        Self {
            shutdown: true,
            ..Self::default()
        }
    }

    /// Initial batch carrying a workflow snapshot
    #[inline]
    #[must_use]
    pub fn initial(workflow: JsonValue) -> Self {
        Self {
            added: Some(DeltasAdded {
                workflow: Some(workflow),
                ..DeltasAdded::default()
            }),
            ..Self::default()
        }
    }

    /// Workflow snapshot, if this is an initial batch
    #[inline]
    #[must_use]
    pub fn workflow(&self) -> Option<&JsonValue> {
        self.added.as_ref().and_then(|added| added.workflow.as_ref())
    }

    /// Check if any of pruned/added/updated is present
    #[inline]
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.pruned.is_some() || self.added.is_some() || self.updated.is_some()
    }
}

impl DeltasAdded {
    /// Records of one kind (empty when absent)
    #[must_use]
    pub fn items(&self, kind: EntityKind) -> &[JsonValue] {
        let list = match kind {
            EntityKind::CyclePoint => &self.cycle_points,
            EntityKind::FamilyProxy => &self.family_proxies,
            EntityKind::TaskProxy => &self.task_proxies,
            EntityKind::Job => &self.jobs,
        };
        list.as_deref().unwrap_or(&[])
    }
}

impl DeltasUpdated {
    /// Records of one kind; cycle points are never updated
    #[must_use]
    pub fn items(&self, kind: EntityKind) -> &[JsonValue] {
        let list = match kind {
            EntityKind::CyclePoint => return &[],
            EntityKind::FamilyProxy => &self.family_proxies,
            EntityKind::TaskProxy => &self.task_proxies,
            EntityKind::Job => &self.jobs,
        };
        list.as_deref().unwrap_or(&[])
    }
}

impl DeltasPruned {
    /// Ids of one kind; cycle points go away with their root family
    #[must_use]
    pub fn ids(&self, kind: EntityKind) -> &[String] {
        let list = match kind {
            EntityKind::CyclePoint => return &[],
            EntityKind::FamilyProxy => &self.family_proxies,
            EntityKind::TaskProxy => &self.task_proxies,
            EntityKind::Job => &self.jobs,
        };
        list.as_deref().unwrap_or(&[])
    }
}

/// Records of one kind inside a workflow snapshot
///
/// A stopped workflow may omit lists entirely (e.g. no families once `root`
/// is filtered out); absence reads as empty.
#[must_use]
pub fn snapshot_items(workflow: &JsonValue, kind: EntityKind) -> &[JsonValue] {
    workflow
        .get(kind.field_name())
        .and_then(JsonValue::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Jobs nested under a snapshot task proxy
#[must_use]
pub fn task_jobs(task: &JsonValue) -> &[JsonValue] {
    snapshot_items(task, EntityKind::Job)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_camel_case_batch() {
        let deltas: Deltas = serde_json::from_value(json!({
            "id": "user|wf",
            "shutdown": false,
            "updated": {"taskProxies": [{"id": "t1"}]},
            "pruned": {"jobs": ["j1", "j2"], "taskProxies": null}
        }))
        .unwrap();

        assert!(deltas.has_changes());
        assert!(deltas.added.is_none());
        let updated = deltas.updated.as_ref().unwrap();
        assert_eq!(updated.items(EntityKind::TaskProxy).len(), 1);
        assert!(updated.items(EntityKind::Job).is_empty());
        let pruned = deltas.pruned.as_ref().unwrap();
        assert_eq!(pruned.ids(EntityKind::Job), ["j1", "j2"]);
        assert!(pruned.ids(EntityKind::TaskProxy).is_empty());
    }

    #[test]
    fn missing_shutdown_defaults_false() {
        let deltas: Deltas = serde_json::from_str("{}").unwrap();
        assert!(!deltas.shutdown);
        assert!(!deltas.has_changes());
    }

    #[test]
    fn initial_batch_exposes_workflow() {
        let deltas = Deltas::initial(json!({"id": "user|wf"}));
        assert_eq!(deltas.workflow(), Some(&json!({"id": "user|wf"})));
        assert!(Deltas::shutdown().workflow().is_none());
    }

    #[test]
    fn snapshot_lists_default_empty() {
        let workflow = json!({
            "id": "user|wf",
            "taskProxies": [{"id": "t1", "jobs": [{"id": "j1"}]}]
        });
        assert!(snapshot_items(&workflow, EntityKind::FamilyProxy).is_empty());
        let tasks = snapshot_items(&workflow, EntityKind::TaskProxy);
        assert_eq!(task_jobs(&tasks[0]).len(), 1);
    }
}
