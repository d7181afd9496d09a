//! Normalized node records
//!
//! Produced by [`crate::normalize`]. Every node keeps its raw payload in
//! `data` so fields without a typed counterpart survive updates.

use crate::id::NodeId;
use crate::merge::{merge_json, merge_opt, Merge};
use crate::state::{StateTally, TaskState};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Workflow root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowNode {
    pub id: NodeId,
    pub name: Option<String>,
    pub status: Option<String>,
    pub status_msg: Option<String>,
    /// Raw payload, without the nested snapshot lists
    pub data: JsonValue,
}

/// Cycle point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CyclePointNode {
    pub id: NodeId,
    /// Point label that families and tasks refer to
    pub point: String,
    /// Group state derived from the tally
    pub state: Option<TaskState>,
    /// Descendant task counts by state (derived)
    pub state_totals: StateTally,
    pub data: JsonValue,
}

/// Family proxy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyProxyNode {
    pub id: NodeId,
    pub name: Option<String>,
    pub cycle_point: Option<String>,
    /// Parent family; `None` attaches directly under the cycle point
    pub first_parent: Option<NodeId>,
    pub state: Option<TaskState>,
    pub data: JsonValue,
}

/// Task proxy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskProxyNode {
    pub id: NodeId,
    pub name: Option<String>,
    pub cycle_point: Option<String>,
    /// Parent family; `None` attaches directly under the cycle point
    pub first_parent: Option<NodeId>,
    pub state: Option<TaskState>,
    pub is_held: Option<bool>,
    pub latest_message: Option<String>,
    /// Raw payload, without the nested job list
    pub data: JsonValue,
}

/// Job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobNode {
    pub id: NodeId,
    /// Owning task
    pub first_parent: Option<NodeId>,
    pub state: Option<TaskState>,
    pub submit_num: Option<u32>,
    pub submitted_time: Option<DateTime<FixedOffset>>,
    pub started_time: Option<DateTime<FixedOffset>>,
    pub finished_time: Option<DateTime<FixedOffset>>,
    pub host: Option<String>,
    pub job_runner_name: Option<String>,
    pub data: JsonValue,
}

impl CyclePointNode {
    /// Total number of tallied tasks
    #[inline]
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.state_totals.values().sum()
    }
}

impl Merge for WorkflowNode {
    fn merge_from(&mut self, incoming: Self) {
        merge_opt(&mut self.name, incoming.name);
        merge_opt(&mut self.status, incoming.status);
        merge_opt(&mut self.status_msg, incoming.status_msg);
        merge_json(&mut self.data, incoming.data);
    }
}

impl Merge for CyclePointNode {
    /// Tally fields are derived and never merged
    fn merge_from(&mut self, incoming: Self) {
        self.point = incoming.point;
        merge_json(&mut self.data, incoming.data);
    }
}

impl Merge for FamilyProxyNode {
    fn merge_from(&mut self, incoming: Self) {
        merge_opt(&mut self.name, incoming.name);
        merge_opt(&mut self.cycle_point, incoming.cycle_point);
        merge_opt(&mut self.first_parent, incoming.first_parent);
        merge_opt(&mut self.state, incoming.state);
        merge_json(&mut self.data, incoming.data);
    }
}

impl Merge for TaskProxyNode {
    fn merge_from(&mut self, incoming: Self) {
        merge_opt(&mut self.name, incoming.name);
        merge_opt(&mut self.cycle_point, incoming.cycle_point);
        merge_opt(&mut self.first_parent, incoming.first_parent);
        merge_opt(&mut self.state, incoming.state);
        merge_opt(&mut self.is_held, incoming.is_held);
        merge_opt(&mut self.latest_message, incoming.latest_message);
        merge_json(&mut self.data, incoming.data);
    }
}

impl Merge for JobNode {
    fn merge_from(&mut self, incoming: Self) {
        merge_opt(&mut self.first_parent, incoming.first_parent);
        merge_opt(&mut self.state, incoming.state);
        merge_opt(&mut self.submit_num, incoming.submit_num);
        merge_opt(&mut self.submitted_time, incoming.submitted_time);
        merge_opt(&mut self.started_time, incoming.started_time);
        merge_opt(&mut self.finished_time, incoming.finished_time);
        merge_opt(&mut self.host, incoming.host);
        merge_opt(&mut self.job_runner_name, incoming.job_runner_name);
        merge_json(&mut self.data, incoming.data);
    }
}
