//! Entity kinds carried by delta batches

use serde::{Deserialize, Serialize};

/// Closed set of entity kinds below the workflow root
///
/// Each section of a batch is processed kind by kind in one of the fixed
/// orders below; parents always precede children when adding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    /// Cycle point (temporal grouping)
    CyclePoint,

    /// Family proxy (named grouping)
    FamilyProxy,

    /// Task proxy
    TaskProxy,

    /// Job (a submission of a task)
    Job,
}

impl EntityKind {
    /// Order for added deltas and snapshot ingestion (parents first)
    pub const ADD_ORDER: [Self; 4] = [
        Self::CyclePoint,
        Self::FamilyProxy,
        Self::TaskProxy,
        Self::Job,
    ];

    /// Order for updated deltas
    pub const UPDATE_ORDER: [Self; 3] = [Self::FamilyProxy, Self::TaskProxy, Self::Job];

    /// Order for pruned deltas (children first)
    pub const PRUNE_ORDER: [Self; 3] = [Self::Job, Self::TaskProxy, Self::FamilyProxy];

    /// Field name used by the wire payload
    #[inline]
    #[must_use]
    pub fn field_name(self) -> &'static str {
        match self {
            Self::CyclePoint => "cyclePoints",
            Self::FamilyProxy => "familyProxies",
            Self::TaskProxy => "taskProxies",
            Self::Job => "jobs",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::CyclePoint => "cycle point",
            Self::FamilyProxy => "family proxy",
            Self::TaskProxy => "task proxy",
            Self::Job => "job",
        };
        f.write_str(name)
    }
}
