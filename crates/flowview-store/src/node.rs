//! Tree nodes and entries

use flowview_model::{
    CyclePointNode, EntityKind, FamilyProxyNode, JobNode, NodeId, TaskProxyNode,
};

/// Node held by the store
#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    CyclePoint(CyclePointNode),
    FamilyProxy(FamilyProxyNode),
    TaskProxy(TaskProxyNode),
    Job(JobNode),
}

impl TreeNode {
    /// Node id
    #[must_use]
    pub fn id(&self) -> &NodeId {
        match self {
            Self::CyclePoint(node) => &node.id,
            Self::FamilyProxy(node) => &node.id,
            Self::TaskProxy(node) => &node.id,
            Self::Job(node) => &node.id,
        }
    }

    /// Node kind
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::CyclePoint(_) => EntityKind::CyclePoint,
            Self::FamilyProxy(_) => EntityKind::FamilyProxy,
            Self::TaskProxy(_) => EntityKind::TaskProxy,
            Self::Job(_) => EntityKind::Job,
        }
    }

    /// Parent family (or owning task, for jobs) the node declares
    #[must_use]
    pub fn declared_parent(&self) -> Option<&NodeId> {
        match self {
            Self::CyclePoint(_) => None,
            Self::FamilyProxy(node) => node.first_parent.as_ref(),
            Self::TaskProxy(node) => node.first_parent.as_ref(),
            Self::Job(node) => node.first_parent.as_ref(),
        }
    }

    #[inline]
    #[must_use]
    pub fn as_cycle_point(&self) -> Option<&CyclePointNode> {
        match self {
            Self::CyclePoint(node) => Some(node),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_family_proxy(&self) -> Option<&FamilyProxyNode> {
        match self {
            Self::FamilyProxy(node) => Some(node),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_task_proxy(&self) -> Option<&TaskProxyNode> {
        match self {
            Self::TaskProxy(node) => Some(node),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_job(&self) -> Option<&JobNode> {
        match self {
            Self::Job(node) => Some(node),
            _ => None,
        }
    }
}

/// Indexed node with its place in the hierarchy
#[derive(Debug, Clone, PartialEq)]
pub struct TreeEntry {
    pub(crate) node: TreeNode,
    /// `None` only for cycle points, which hang off the workflow root
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl TreeEntry {
    pub(crate) fn new(node: TreeNode, parent: Option<NodeId>) -> Self {
        Self {
            node,
            parent,
            children: Vec::new(),
        }
    }

    /// The node
    #[inline]
    #[must_use]
    pub fn node(&self) -> &TreeNode {
        &self.node
    }

    /// Parent id; `None` for cycle points
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<&NodeId> {
        self.parent.as_ref()
    }

    /// Child ids, in display order
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}
