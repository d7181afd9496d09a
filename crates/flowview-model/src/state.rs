//! Task and job states

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Per-state task counts for a cycle point
pub type StateTally = BTreeMap<TaskState, usize>;

/// Lifecycle state of a task proxy or job
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    /// Waiting on prerequisites
    Waiting,
    /// Preparing for submission
    Preparing,
    /// Submitted to the job runner
    Submitted,
    /// Running
    Running,
    /// Finished successfully
    Succeeded,
    /// Finished with failure
    Failed,
    /// Job submission failed
    SubmitFailed,
    /// Expired before running
    Expired,
}

impl TaskState {
    /// All states, in declaration order
    pub const ALL: [Self; 8] = [
        Self::Waiting,
        Self::Preparing,
        Self::Submitted,
        Self::Running,
        Self::Succeeded,
        Self::Failed,
        Self::SubmitFailed,
        Self::Expired,
    ];

    /// Wire name
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Preparing => "preparing",
            Self::Submitted => "submitted",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::SubmitFailed => "submit-failed",
            Self::Expired => "expired",
        }
    }

    /// Rank used when summarising a group; lower wins
    fn group_rank(self) -> u8 {
        match self {
            Self::SubmitFailed => 0,
            Self::Failed => 1,
            Self::Expired => 2,
            Self::Running => 3,
            Self::Submitted => 4,
            Self::Preparing => 5,
            Self::Waiting => 6,
            Self::Succeeded => 7,
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown state name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown task state '{0}'")]
pub struct ParseStateError(pub String);

impl FromStr for TaskState {
    type Err = ParseStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| ParseStateError(s.to_string()))
    }
}

/// Summarise member states into the state shown for the group
///
/// Failures dominate, then activity, then waiting; a group is only
/// `succeeded` when every member is.
#[must_use]
pub fn group_state(states: impl IntoIterator<Item = TaskState>) -> Option<TaskState> {
    states.into_iter().min_by_key(|state| state.group_rank())
}
