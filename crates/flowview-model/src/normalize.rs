//! Node normalizer
//!
//! Pure constructors from raw wire records to typed nodes. Only `id` is
//! required: update records are partial, so every other field is optional
//! here and enforced (if at all) by whoever inserts the node.

use crate::id::NodeId;
use crate::node::{CyclePointNode, FamilyProxyNode, JobNode, TaskProxyNode, WorkflowNode};
use crate::state::{StateTally, TaskState};
use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value as JsonValue};

/// Name of the implicit top-level family of every cycle point
pub const ROOT_FAMILY: &str = "root";

/// Snapshot lists dropped from the workflow payload
const SNAPSHOT_FIELDS: [&str; 3] = ["cyclePoints", "familyProxies", "taskProxies"];

/// Errors while normalizing a raw record
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    /// Record is not a JSON object
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// Required field absent or null
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    /// Field present with the wrong shape
    #[error("field '{field}' is invalid: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },

    /// State name not recognised
    #[error("unknown task state '{0}'")]
    UnknownState(String),
}

impl NormalizeError {
    /// Create invalid field error
    #[inline]
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

/// Check whether a workflow payload carries anything to build a tree from
#[must_use]
pub fn contains_tree_data(workflow: &JsonValue) -> bool {
    SNAPSHOT_FIELDS
        .iter()
        .any(|field| workflow.get(field).is_some_and(JsonValue::is_array))
}

/// Workflow root from the snapshot payload
///
/// # Errors
/// Returns error if the record is not an object or lacks an id
pub fn create_workflow_node(raw: &JsonValue) -> Result<WorkflowNode, NormalizeError> {
    let map = object(raw)?;
    let mut data = map.clone();
    for field in SNAPSHOT_FIELDS {
        data.remove(field);
    }
    Ok(WorkflowNode {
        id: required_id(map)?,
        name: opt_string(map, "name")?,
        status: opt_string(map, "status")?,
        status_msg: opt_string(map, "statusMsg")?,
        data: JsonValue::Object(data),
    })
}

/// Cycle point; the label falls back to the id
///
/// # Errors
/// Returns error if the record is not an object or lacks an id
pub fn create_cycle_point_node(raw: &JsonValue) -> Result<CyclePointNode, NormalizeError> {
    let map = object(raw)?;
    let id = required_id(map)?;
    let point = opt_string(map, "cyclePoint")?.unwrap_or_else(|| id.to_string());
    Ok(CyclePointNode {
        id,
        point,
        state: None,
        state_totals: StateTally::new(),
        data: raw.clone(),
    })
}

/// Family proxy
///
/// # Errors
/// Returns error on a missing id or malformed field
pub fn create_family_proxy_node(raw: &JsonValue) -> Result<FamilyProxyNode, NormalizeError> {
    let map = object(raw)?;
    Ok(FamilyProxyNode {
        id: required_id(map)?,
        name: opt_string(map, "name")?,
        cycle_point: opt_string(map, "cyclePoint")?,
        first_parent: family_parent(map)?,
        state: opt_state(map)?,
        data: raw.clone(),
    })
}

/// Task proxy; nested jobs are left out of `data`
///
/// # Errors
/// Returns error on a missing id or malformed field
pub fn create_task_proxy_node(raw: &JsonValue) -> Result<TaskProxyNode, NormalizeError> {
    let map = object(raw)?;
    let mut data = map.clone();
    data.remove("jobs");
    Ok(TaskProxyNode {
        id: required_id(map)?,
        name: opt_string(map, "name")?,
        cycle_point: opt_string(map, "cyclePoint")?,
        first_parent: family_parent(map)?,
        state: opt_state(map)?,
        is_held: opt_bool(map, "isHeld")?,
        latest_message: opt_string(map, "latestMessage")?,
        data: JsonValue::Object(data),
    })
}

/// Job
///
/// # Errors
/// Returns error on a missing id or malformed field
pub fn create_job_node(raw: &JsonValue) -> Result<JobNode, NormalizeError> {
    let map = object(raw)?;
    Ok(JobNode {
        id: required_id(map)?,
        first_parent: parent_id(map)?,
        state: opt_state(map)?,
        submit_num: opt_u32(map, "submitNum")?,
        submitted_time: opt_time(map, "submittedTime")?,
        started_time: opt_time(map, "startedTime")?,
        finished_time: opt_time(map, "finishedTime")?,
        host: opt_string(map, "host")?,
        job_runner_name: opt_string(map, "jobRunnerName")?,
        data: raw.clone(),
    })
}

/// Owner id from `firstParent`, if the record names one
///
/// Malformed references are treated as absent; callers decide whether that
/// is fatal for the item.
#[must_use]
pub fn first_parent_id(raw: &JsonValue) -> Option<NodeId> {
    raw.get("firstParent")
        .and_then(|parent| parent.get("id"))
        .and_then(JsonValue::as_str)
        .filter(|id| !id.is_empty())
        .map(NodeId::from)
}

fn json_type(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

fn object(raw: &JsonValue) -> Result<&Map<String, JsonValue>, NormalizeError> {
    raw.as_object()
        .ok_or_else(|| NormalizeError::NotAnObject(json_type(raw)))
}

/// Field value, treating `null` as absent
fn present<'a>(map: &'a Map<String, JsonValue>, field: &str) -> Option<&'a JsonValue> {
    map.get(field).filter(|value| !value.is_null())
}

fn required_id(map: &Map<String, JsonValue>) -> Result<NodeId, NormalizeError> {
    match present(map, "id") {
        None => Err(NormalizeError::MissingField("id")),
        Some(JsonValue::String(id)) if id.is_empty() => Err(NormalizeError::MissingField("id")),
        Some(JsonValue::String(id)) => Ok(NodeId::new(id.as_str())),
        Some(other) => Err(NormalizeError::invalid(
            "id",
            format!("expected string, got {}", json_type(other)),
        )),
    }
}

fn opt_string(
    map: &Map<String, JsonValue>,
    field: &'static str,
) -> Result<Option<String>, NormalizeError> {
    match present(map, field) {
        None => Ok(None),
        Some(JsonValue::String(value)) => Ok(Some(value.clone())),
        Some(other) => Err(NormalizeError::invalid(
            field,
            format!("expected string, got {}", json_type(other)),
        )),
    }
}

fn opt_bool(
    map: &Map<String, JsonValue>,
    field: &'static str,
) -> Result<Option<bool>, NormalizeError> {
    match present(map, field) {
        None => Ok(None),
        Some(JsonValue::Bool(value)) => Ok(Some(*value)),
        Some(other) => Err(NormalizeError::invalid(
            field,
            format!("expected boolean, got {}", json_type(other)),
        )),
    }
}

fn opt_u32(
    map: &Map<String, JsonValue>,
    field: &'static str,
) -> Result<Option<u32>, NormalizeError> {
    match present(map, field) {
        None => Ok(None),
        Some(value) => value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| NormalizeError::invalid(field, format!("expected u32, got {value}"))),
    }
}

fn opt_state(map: &Map<String, JsonValue>) -> Result<Option<TaskState>, NormalizeError> {
    match opt_string(map, "state")? {
        None => Ok(None),
        // an empty state is sent for nodes that have not been evaluated yet
        Some(state) if state.is_empty() => Ok(None),
        Some(state) => state
            .parse()
            .map(Some)
            .map_err(|_| NormalizeError::UnknownState(state)),
    }
}

fn opt_time(
    map: &Map<String, JsonValue>,
    field: &'static str,
) -> Result<Option<DateTime<FixedOffset>>, NormalizeError> {
    match opt_string(map, field)? {
        None => Ok(None),
        Some(text) if text.is_empty() => Ok(None),
        Some(text) => DateTime::parse_from_rfc3339(&text)
            .map(Some)
            .map_err(|e| NormalizeError::invalid(field, format!("'{text}': {e}"))),
    }
}

fn parent_id(map: &Map<String, JsonValue>) -> Result<Option<NodeId>, NormalizeError> {
    match present(map, "firstParent") {
        None => Ok(None),
        Some(JsonValue::Object(parent)) => match present(parent, "id") {
            None => Ok(None),
            Some(JsonValue::String(id)) if id.is_empty() => Ok(None),
            Some(JsonValue::String(id)) => Ok(Some(NodeId::new(id.as_str()))),
            Some(other) => Err(NormalizeError::invalid(
                "firstParent",
                format!("expected string id, got {}", json_type(other)),
            )),
        },
        Some(other) => Err(NormalizeError::invalid(
            "firstParent",
            format!("expected object, got {}", json_type(other)),
        )),
    }
}

/// Parent family, with the root family mapped to "directly under the cycle point"
fn family_parent(map: &Map<String, JsonValue>) -> Result<Option<NodeId>, NormalizeError> {
    let is_root = map
        .get("firstParent")
        .and_then(|parent| parent.get("name"))
        .and_then(JsonValue::as_str)
        == Some(ROOT_FAMILY);
    if is_root {
        return Ok(None);
    }
    parent_id(map)
}
