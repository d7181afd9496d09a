//! Store errors

use flowview_model::{EntityKind, NodeId};

/// Failure of a single store operation
///
/// None of these leave the store inconsistent: an operation either applies
/// in full or not at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Operation not valid for the current store state
    #[error("invalid store state: {0}")]
    InvalidState(String),

    /// Node does not say where it belongs
    #[error("{kind} '{id}' does not name its parent")]
    UnknownParent { kind: EntityKind, id: NodeId },

    /// Node names a parent that is not indexed
    #[error("parent '{parent}' of {kind} '{id}' is not in the store")]
    MissingParent {
        kind: EntityKind,
        id: NodeId,
        parent: String,
    },

    /// Id is held by a node of another kind
    #[error("'{id}' is a {existing}, not a {requested}")]
    KindMismatch {
        id: NodeId,
        existing: EntityKind,
        requested: EntityKind,
    },
}

impl StoreError {
    /// Create missing parent error
    #[inline]
    pub fn missing_parent(kind: EntityKind, id: &NodeId, parent: impl Into<String>) -> Self {
        Self::MissingParent {
            kind,
            id: id.clone(),
            parent: parent.into(),
        }
    }

    /// Create kind mismatch error
    #[inline]
    #[must_use]
    pub fn kind_mismatch(id: &NodeId, existing: EntityKind, requested: EntityKind) -> Self {
        Self::KindMismatch {
            id: id.clone(),
            existing,
            requested,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_display() {
        let err = StoreError::missing_parent(EntityKind::Job, &NodeId::new("j1"), "t1");
        assert_eq!(err.to_string(), "parent 't1' of job 'j1' is not in the store");

        let err = StoreError::kind_mismatch(&NodeId::new("x"), EntityKind::TaskProxy, EntityKind::Job);
        assert_eq!(err.to_string(), "'x' is a task proxy, not a job");
    }
}
