//! Workflow tree: hierarchy plus id index
//!
//! Cycle points hang off the workflow root. Families and tasks hang off
//! their parent family when it is indexed, else off their cycle point; a
//! family that arrives late adopts the nodes that were waiting for it. Jobs
//! hang off their task, newest submission first.

use crate::error::StoreError;
use crate::node::{TreeEntry, TreeNode};
use flowview_model::{
    CyclePointNode, EntityKind, FamilyProxyNode, JobNode, Merge, NodeId, TaskProxyNode,
    WorkflowNode,
};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Entity store for one observed workflow
///
/// Either empty (no workflow root) or rooted; nodes can only be added
/// once the root is set.
#[derive(Debug, Clone, Default)]
pub struct WorkflowTree {
    /// Root; `None` means the store is empty
    workflow: Option<WorkflowNode>,

    /// Root children, in arrival order
    cycle_points: Vec<NodeId>,

    /// Point label -> cycle point id
    points: HashMap<String, NodeId>,

    /// Every non-root node
    lookup: IndexMap<NodeId, TreeEntry>,

    /// Absent family -> nodes that declared it as parent
    waiting: HashMap<NodeId, Vec<NodeId>>,
}

/// Where a family or task goes
struct Placement {
    parent: NodeId,
    /// Declared parent family, not yet indexed
    awaiting: Option<NodeId>,
}

impl WorkflowTree {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether no workflow root is set
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.workflow.is_none()
    }

    /// Install the workflow root
    ///
    /// # Errors
    /// Returns error if the node has an empty id
    pub fn set_workflow(&mut self, node: WorkflowNode) -> Result<(), StoreError> {
        if node.id.is_empty() {
            return Err(StoreError::InvalidState(
                "workflow node has an empty id".to_string(),
            ));
        }
        self.workflow = Some(node);
        Ok(())
    }

    /// Workflow root
    #[inline]
    #[must_use]
    pub fn workflow(&self) -> Option<&WorkflowNode> {
        self.workflow.as_ref()
    }

    /// Reset to the empty state
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Add a cycle point; an existing one is replaced, keeping its children
    ///
    /// # Errors
    /// Returns error if the store is empty or the id belongs to another kind
    pub fn add_cycle_point(&mut self, node: CyclePointNode) -> Result<(), StoreError> {
        self.ensure_root(EntityKind::CyclePoint, &node.id)?;
        let id = node.id.clone();
        let point = node.point.clone();

        match self.lookup.get_mut(&id) {
            Some(entry) => {
                let existing_kind = entry.node.kind();
                let TreeNode::CyclePoint(existing) = &mut entry.node else {
                    return Err(StoreError::kind_mismatch(
                        &id,
                        existing_kind,
                        EntityKind::CyclePoint,
                    ));
                };
                if existing.point != point
                    && self.points.get(&existing.point) == Some(&id)
                {
                    self.points.remove(&existing.point);
                }
                tracing::trace!(%id, "cycle point re-added, replacing");
                *existing = node;
            }
            None => {
                self.lookup
                    .insert(id.clone(), TreeEntry::new(TreeNode::CyclePoint(node), None));
                self.cycle_points.push(id.clone());
            }
        }

        self.points.insert(point, id);
        Ok(())
    }

    /// Add a family proxy; an existing one is replaced, keeping its children
    ///
    /// # Errors
    /// Returns error if the store is empty, the cycle point is unknown, or
    /// the id belongs to another kind
    pub fn add_family_proxy(&mut self, node: FamilyProxyNode) -> Result<(), StoreError> {
        self.ensure_root(EntityKind::FamilyProxy, &node.id)?;
        let id = node.id.clone();
        let placement = self.placement(
            EntityKind::FamilyProxy,
            &id,
            node.cycle_point.as_deref(),
            node.first_parent.as_ref(),
        )?;
        self.upsert(TreeNode::FamilyProxy(node), placement)?;
        self.adopt(&id);
        Ok(())
    }

    /// Add a task proxy; an existing one is replaced, keeping its jobs
    ///
    /// # Errors
    /// Returns error if the store is empty, the cycle point is unknown, or
    /// the id belongs to another kind
    pub fn add_task_proxy(&mut self, node: TaskProxyNode) -> Result<(), StoreError> {
        self.ensure_root(EntityKind::TaskProxy, &node.id)?;
        let placement = self.placement(
            EntityKind::TaskProxy,
            &node.id,
            node.cycle_point.as_deref(),
            node.first_parent.as_ref(),
        )?;
        self.upsert(TreeNode::TaskProxy(node), placement)
    }

    /// Add a job under its owning task
    ///
    /// # Errors
    /// Returns error if the store is empty, the owning task is absent, or the
    /// id belongs to another kind
    pub fn add_job(&mut self, node: JobNode) -> Result<(), StoreError> {
        self.ensure_root(EntityKind::Job, &node.id)?;
        let owner = node
            .first_parent
            .clone()
            .ok_or_else(|| StoreError::UnknownParent {
                kind: EntityKind::Job,
                id: node.id.clone(),
            })?;

        match self.lookup.get(&owner).map(|entry| entry.node.kind()) {
            Some(EntityKind::TaskProxy) => {}
            Some(other) => {
                return Err(StoreError::kind_mismatch(&owner, other, EntityKind::TaskProxy));
            }
            None => {
                return Err(StoreError::missing_parent(
                    EntityKind::Job,
                    &node.id,
                    owner.as_str(),
                ));
            }
        }

        self.upsert(
            TreeNode::Job(node),
            Placement {
                parent: owner,
                awaiting: None,
            },
        )
    }

    /// Merge a partial family proxy; returns `false` if it is not indexed
    ///
    /// # Errors
    /// Returns error if the id belongs to another kind
    pub fn update_family_proxy(&mut self, node: FamilyProxyNode) -> Result<bool, StoreError> {
        match self.node_mut(&node.id, EntityKind::FamilyProxy)? {
            Some(TreeNode::FamilyProxy(existing)) => {
                existing.merge_from(node);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Merge a partial task proxy; returns `false` if it is not indexed
    ///
    /// # Errors
    /// Returns error if the id belongs to another kind
    pub fn update_task_proxy(&mut self, node: TaskProxyNode) -> Result<bool, StoreError> {
        match self.node_mut(&node.id, EntityKind::TaskProxy)? {
            Some(TreeNode::TaskProxy(existing)) => {
                existing.merge_from(node);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Merge a partial job; returns `false` if it is not indexed
    ///
    /// # Errors
    /// Returns error if the id belongs to another kind
    pub fn update_job(&mut self, node: JobNode) -> Result<bool, StoreError> {
        match self.node_mut(&node.id, EntityKind::Job)? {
            Some(TreeNode::Job(existing)) => {
                existing.merge_from(node);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Remove a family and everything below it
    ///
    /// The id of a cycle point is accepted too: pruning a cycle's root
    /// family removes the cycle point.
    ///
    /// # Errors
    /// Returns error if the id belongs to a task or job
    pub fn remove_family_proxy(&mut self, id: &str) -> Result<bool, StoreError> {
        match self.kind_of(id) {
            None => Ok(false),
            Some(EntityKind::FamilyProxy | EntityKind::CyclePoint) => {
                self.remove_subtree(id);
                Ok(true)
            }
            Some(other) => Err(StoreError::kind_mismatch(
                &NodeId::from(id),
                other,
                EntityKind::FamilyProxy,
            )),
        }
    }

    /// Remove a task and its jobs
    ///
    /// # Errors
    /// Returns error if the id belongs to another kind
    pub fn remove_task_proxy(&mut self, id: &str) -> Result<bool, StoreError> {
        self.remove_kind(id, EntityKind::TaskProxy)
    }

    /// Remove a job
    ///
    /// # Errors
    /// Returns error if the id belongs to another kind
    pub fn remove_job(&mut self, id: &str) -> Result<bool, StoreError> {
        self.remove_kind(id, EntityKind::Job)
    }

    /// Indexed node by id
    #[inline]
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&TreeNode> {
        self.lookup.get(id).map(TreeEntry::node)
    }

    /// Indexed entry (node plus hierarchy links) by id
    #[inline]
    #[must_use]
    pub fn entry(&self, id: &str) -> Option<&TreeEntry> {
        self.lookup.get(id)
    }

    /// Check if id is indexed
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.lookup.contains_key(id)
    }

    /// Number of indexed nodes, root excluded
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    /// Number of indexed nodes of one kind
    #[must_use]
    pub fn count(&self, kind: EntityKind) -> usize {
        self.lookup
            .values()
            .filter(|entry| entry.node.kind() == kind)
            .count()
    }

    /// All indexed nodes
    pub fn iter(&self) -> impl Iterator<Item = &TreeNode> + '_ {
        self.lookup.values().map(TreeEntry::node)
    }

    /// Cycle points, in arrival order
    pub fn cycle_points(&self) -> impl Iterator<Item = &CyclePointNode> + '_ {
        self.cycle_points
            .iter()
            .filter_map(|id| self.get(id.as_str()).and_then(TreeNode::as_cycle_point))
    }

    /// Cycle point by its point label
    #[must_use]
    pub fn cycle_point_for(&self, point: &str) -> Option<&CyclePointNode> {
        self.points
            .get(point)
            .and_then(|id| self.get(id.as_str()))
            .and_then(TreeNode::as_cycle_point)
    }

    /// Child ids of a node (empty when absent)
    #[must_use]
    pub fn children(&self, id: &str) -> &[NodeId] {
        self.lookup.get(id).map_or(&[], |entry| entry.children())
    }

    /// Parent id of a node; `None` for cycle points and absent ids
    #[must_use]
    pub fn parent(&self, id: &str) -> Option<&NodeId> {
        self.lookup.get(id).and_then(TreeEntry::parent)
    }

    /// Jobs of a task, newest first
    pub fn jobs<'a>(&'a self, task: &str) -> impl Iterator<Item = &'a JobNode> + 'a {
        self.children(task)
            .iter()
            .filter_map(|id| self.get(id.as_str()).and_then(TreeNode::as_job))
    }

    pub(crate) fn node_entry_mut(&mut self, id: &NodeId) -> Option<&mut TreeNode> {
        self.lookup.get_mut(id).map(|entry| &mut entry.node)
    }

    fn ensure_root(&self, kind: EntityKind, id: &NodeId) -> Result<(), StoreError> {
        if self.is_empty() {
            return Err(StoreError::InvalidState(format!(
                "cannot add {kind} '{id}' before the workflow root"
            )));
        }
        Ok(())
    }

    fn kind_of(&self, id: &str) -> Option<EntityKind> {
        self.lookup.get(id).map(|entry| entry.node.kind())
    }

    fn node_mut(
        &mut self,
        id: &NodeId,
        kind: EntityKind,
    ) -> Result<Option<&mut TreeNode>, StoreError> {
        match self.lookup.get_mut(id) {
            None => Ok(None),
            Some(entry) if entry.node.kind() == kind => Ok(Some(&mut entry.node)),
            Some(entry) => Err(StoreError::kind_mismatch(id, entry.node.kind(), kind)),
        }
    }

    fn placement(
        &self,
        kind: EntityKind,
        id: &NodeId,
        cycle_point: Option<&str>,
        first_parent: Option<&NodeId>,
    ) -> Result<Placement, StoreError> {
        let mut awaiting = None;
        if let Some(family) = first_parent.filter(|family| *family != id) {
            match self.kind_of(family.as_str()) {
                Some(EntityKind::FamilyProxy | EntityKind::CyclePoint)
                    if !self.is_within(family, id) =>
                {
                    return Ok(Placement {
                        parent: family.clone(),
                        awaiting: None,
                    });
                }
                Some(_) => {}
                None => awaiting = Some(family.clone()),
            }
        }

        let point = cycle_point.ok_or_else(|| StoreError::UnknownParent {
            kind,
            id: id.clone(),
        })?;
        let parent = self
            .points
            .get(point)
            .cloned()
            .ok_or_else(|| StoreError::missing_parent(kind, id, point))?;
        Ok(Placement { parent, awaiting })
    }

    /// Insert or replace a non-root node, keeping existing children
    fn upsert(&mut self, node: TreeNode, placement: Placement) -> Result<(), StoreError> {
        let id = node.id().clone();
        let Placement { parent, awaiting } = placement;

        let previous_parent = match self.lookup.get_mut(&id) {
            Some(entry) => {
                let existing = entry.node.kind();
                if existing != node.kind() {
                    return Err(StoreError::kind_mismatch(&id, existing, node.kind()));
                }
                tracing::trace!(%id, kind = %existing, "node re-added, replacing");
                entry.node = node;
                entry.parent.replace(parent.clone())
            }
            None => {
                self.lookup
                    .insert(id.clone(), TreeEntry::new(node, Some(parent.clone())));
                None
            }
        };

        if previous_parent.as_ref() != Some(&parent) {
            if let Some(previous) = previous_parent {
                self.detach(&previous, id.as_str());
            }
            self.attach(&parent, &id);
        }
        if let Some(family) = awaiting {
            self.waiting.entry(family).or_default().push(id);
        }
        Ok(())
    }

    /// Move nodes that were waiting for `family` under it
    fn adopt(&mut self, family: &NodeId) {
        let Some(waiting) = self.waiting.remove(family) else {
            return;
        };
        for child in waiting {
            let still_waiting = self.lookup.get(&child).is_some_and(|entry| {
                entry.node.declared_parent() == Some(family)
                    && entry.parent.as_ref() != Some(family)
            });
            if !still_waiting || self.is_within(family, &child) {
                continue;
            }
            let previous = self
                .lookup
                .get_mut(&child)
                .and_then(|entry| entry.parent.replace(family.clone()));
            if let Some(previous) = previous {
                self.detach(&previous, child.as_str());
            }
            self.attach(family, &child);
            tracing::debug!(%child, %family, "attached waiting node to its family");
        }
    }

    /// Check whether `node` is `ancestor` or lies below it
    fn is_within(&self, node: &NodeId, ancestor: &NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.lookup.get(id).and_then(TreeEntry::parent);
        }
        false
    }

    fn attach(&mut self, parent: &NodeId, child: &NodeId) {
        let position = self.insert_position(parent, child);
        if let Some(entry) = self.lookup.get_mut(parent) {
            if !entry.children.contains(child) {
                let position = position.min(entry.children.len());
                entry.children.insert(position, child.clone());
            }
        }
    }

    fn detach(&mut self, parent: &NodeId, child: &str) {
        if let Some(entry) = self.lookup.get_mut(parent) {
            entry.children.retain(|id| id.as_str() != child);
        }
    }

    /// Jobs sort by submit number, newest first; everything else appends
    fn insert_position(&self, parent: &NodeId, child: &NodeId) -> usize {
        let submit_num = |id: &NodeId| {
            self.get(id.as_str())
                .and_then(TreeNode::as_job)
                .and_then(|job| job.submit_num)
        };
        let siblings = self.children(parent.as_str());
        match submit_num(child) {
            None => siblings.len(),
            Some(submitted) => siblings
                .iter()
                .position(|sibling| submit_num(sibling).map_or(true, |n| n < submitted))
                .unwrap_or(siblings.len()),
        }
    }

    fn remove_kind(&mut self, id: &str, kind: EntityKind) -> Result<bool, StoreError> {
        match self.kind_of(id) {
            None => Ok(false),
            Some(existing) if existing == kind => {
                self.remove_subtree(id);
                Ok(true)
            }
            Some(existing) => Err(StoreError::kind_mismatch(&NodeId::from(id), existing, kind)),
        }
    }

    fn remove_subtree(&mut self, id: &str) {
        let Some(entry) = self.lookup.swap_remove(id) else {
            return;
        };

        match &entry.parent {
            Some(parent) => self.detach(parent, id),
            None => {
                self.cycle_points.retain(|point| point.as_str() != id);
                if let TreeNode::CyclePoint(point) = &entry.node {
                    if self
                        .points
                        .get(&point.point)
                        .is_some_and(|owner| owner.as_str() == id)
                    {
                        self.points.remove(&point.point);
                    }
                }
            }
        }

        let mut removed = 1usize;
        let mut pending = entry.children;
        while let Some(child) = pending.pop() {
            if let Some(child_entry) = self.lookup.swap_remove(&child) {
                pending.extend(child_entry.children);
                removed += 1;
            }
        }
        if !self.waiting.is_empty() {
            let lookup = &self.lookup;
            self.waiting.retain(|_, children| {
                children.retain(|child| lookup.contains_key(child));
                !children.is_empty()
            });
        }
        tracing::trace!(id, removed, "removed subtree");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowview_model::{normalize, TaskState};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn rooted() -> WorkflowTree {
        let mut tree = WorkflowTree::new();
        tree.set_workflow(normalize::create_workflow_node(&json!({"id": "u|wf"})).unwrap())
            .unwrap();
        tree.add_cycle_point(
            normalize::create_cycle_point_node(&json!({"id": "u|wf|1", "cyclePoint": "1"}))
                .unwrap(),
        )
        .unwrap();
        tree
    }

    fn family(id: &str, parent: Option<&str>) -> FamilyProxyNode {
        normalize::create_family_proxy_node(&json!({
            "id": id,
            "name": id,
            "cyclePoint": "1",
            "firstParent": parent.map(|p| json!({"id": p, "name": p}))
        }))
        .unwrap()
    }

    fn task(id: &str, parent: Option<&str>, state: &str) -> TaskProxyNode {
        normalize::create_task_proxy_node(&json!({
            "id": id,
            "name": id,
            "cyclePoint": "1",
            "state": state,
            "firstParent": parent.map(|p| json!({"id": p, "name": p}))
        }))
        .unwrap()
    }

    fn job(id: &str, task: &str, submit_num: u32) -> JobNode {
        normalize::create_job_node(&json!({
            "id": id,
            "firstParent": {"id": task},
            "submitNum": submit_num,
            "state": "submitted"
        }))
        .unwrap()
    }

    fn ids(ids: &[NodeId]) -> Vec<&str> {
        ids.iter().map(NodeId::as_str).collect()
    }

    #[test]
    fn empty_until_workflow_set() {
        let mut tree = WorkflowTree::new();
        assert!(tree.is_empty());

        let point = normalize::create_cycle_point_node(&json!({"id": "u|wf|1"})).unwrap();
        assert!(matches!(tree.add_cycle_point(point), Err(StoreError::InvalidState(_))));

        let root = normalize::create_workflow_node(&json!({"id": "u|wf"})).unwrap();
        tree.set_workflow(root).unwrap();
        assert!(!tree.is_empty());
    }

    #[test]
    fn set_workflow_rejects_empty_id() {
        let mut tree = WorkflowTree::new();
        let mut root = normalize::create_workflow_node(&json!({"id": "u|wf"})).unwrap();
        root.id = NodeId::new("");
        assert!(matches!(tree.set_workflow(root), Err(StoreError::InvalidState(_))));
        assert!(tree.is_empty());
    }

    #[test]
    fn families_and_tasks_attach_by_parent() {
        let mut tree = rooted();
        tree.add_family_proxy(family("u|wf|1|FAM", None)).unwrap();
        tree.add_task_proxy(task("u|wf|1|a", Some("u|wf|1|FAM"), "waiting"))
            .unwrap();
        tree.add_task_proxy(task("u|wf|1|b", None, "waiting")).unwrap();

        assert_eq!(ids(tree.children("u|wf|1")), ["u|wf|1|FAM", "u|wf|1|b"]);
        assert_eq!(ids(tree.children("u|wf|1|FAM")), ["u|wf|1|a"]);
        assert_eq!(tree.parent("u|wf|1|a").map(NodeId::as_str), Some("u|wf|1|FAM"));
    }

    #[test]
    fn late_family_adopts_waiting_nodes() {
        let mut tree = rooted();
        tree.add_family_proxy(family("u|wf|1|SUB", Some("u|wf|1|TOP"))).unwrap();
        tree.add_task_proxy(task("u|wf|1|a", Some("u|wf|1|TOP"), "waiting"))
            .unwrap();
        assert_eq!(ids(tree.children("u|wf|1")), ["u|wf|1|SUB", "u|wf|1|a"]);

        tree.add_family_proxy(family("u|wf|1|TOP", None)).unwrap();

        assert_eq!(ids(tree.children("u|wf|1")), ["u|wf|1|TOP"]);
        assert_eq!(ids(tree.children("u|wf|1|TOP")), ["u|wf|1|SUB", "u|wf|1|a"]);
    }

    #[test]
    fn pruned_nodes_stop_waiting() {
        let mut tree = rooted();
        tree.add_task_proxy(task("u|wf|1|a", Some("u|wf|1|NEVER"), "waiting"))
            .unwrap();
        tree.add_task_proxy(task("u|wf|1|b", Some("u|wf|1|LATE"), "waiting"))
            .unwrap();
        assert_eq!(tree.waiting.len(), 2);

        assert!(tree.remove_task_proxy("u|wf|1|a").unwrap());

        assert!(!tree.waiting.contains_key("u|wf|1|NEVER"));
        assert_eq!(tree.waiting.len(), 1);

        tree.add_family_proxy(family("u|wf|1|LATE", None)).unwrap();
        assert!(tree.waiting.is_empty());
        assert_eq!(ids(tree.children("u|wf|1|LATE")), ["u|wf|1|b"]);
    }

    #[test]
    fn unknown_cycle_point_is_rejected() {
        let mut tree = rooted();
        let mut node = task("u|wf|2|a", None, "waiting");
        node.cycle_point = Some("2".to_string());
        let err = tree.add_task_proxy(node).unwrap_err();
        assert!(matches!(err, StoreError::MissingParent { .. }));
        assert!(!tree.contains("u|wf|2|a"));

        let mut node = task("u|wf|x", None, "waiting");
        node.cycle_point = None;
        assert!(matches!(
            tree.add_task_proxy(node),
            Err(StoreError::UnknownParent { .. })
        ));
    }

    #[test]
    fn jobs_require_their_task() {
        let mut tree = rooted();
        let err = tree.add_job(job("u|wf|1|a|1", "u|wf|1|a", 1)).unwrap_err();
        assert!(matches!(err, StoreError::MissingParent { .. }));

        tree.add_task_proxy(task("u|wf|1|a", None, "running")).unwrap();
        tree.add_job(job("u|wf|1|a|1", "u|wf|1|a", 1)).unwrap();
        tree.add_job(job("u|wf|1|a|3", "u|wf|1|a", 3)).unwrap();
        tree.add_job(job("u|wf|1|a|2", "u|wf|1|a", 2)).unwrap();

        let submit_nums: Vec<_> = tree.jobs("u|wf|1|a").filter_map(|j| j.submit_num).collect();
        assert_eq!(submit_nums, [3, 2, 1]);
    }

    #[test]
    fn job_under_family_is_kind_mismatch() {
        let mut tree = rooted();
        tree.add_family_proxy(family("u|wf|1|FAM", None)).unwrap();
        let err = tree.add_job(job("j", "u|wf|1|FAM", 1)).unwrap_err();
        assert!(matches!(err, StoreError::KindMismatch { .. }));
    }

    #[test]
    fn re_add_is_last_write_wins() {
        let mut tree = rooted();
        tree.add_task_proxy(task("u|wf|1|a", None, "waiting")).unwrap();
        tree.add_job(job("u|wf|1|a|1", "u|wf|1|a", 1)).unwrap();
        let before = tree.len();

        tree.add_task_proxy(task("u|wf|1|a", None, "running")).unwrap();

        assert_eq!(tree.len(), before);
        let node = tree.get("u|wf|1|a").and_then(TreeNode::as_task_proxy).unwrap();
        assert_eq!(node.state, Some(TaskState::Running));
        assert_eq!(ids(tree.children("u|wf|1|a")), ["u|wf|1|a|1"]);
        assert_eq!(ids(tree.children("u|wf|1")), ["u|wf|1|a"]);
    }

    #[test]
    fn update_merges_or_ignores() {
        let mut tree = rooted();
        tree.add_task_proxy(task("u|wf|1|a", None, "waiting")).unwrap();

        let partial = normalize::create_task_proxy_node(&json!({"id": "u|wf|1|a", "isHeld": true}))
            .unwrap();
        assert!(tree.update_task_proxy(partial).unwrap());
        let node = tree.get("u|wf|1|a").and_then(TreeNode::as_task_proxy).unwrap();
        assert_eq!(node.state, Some(TaskState::Waiting));
        assert_eq!(node.is_held, Some(true));

        let missing = normalize::create_task_proxy_node(&json!({"id": "nope"})).unwrap();
        assert!(!tree.update_task_proxy(missing).unwrap());

        let wrong = normalize::create_job_node(&json!({"id": "u|wf|1|a"})).unwrap();
        assert!(matches!(tree.update_job(wrong), Err(StoreError::KindMismatch { .. })));
    }

    #[test]
    fn remove_takes_subtree() {
        let mut tree = rooted();
        tree.add_family_proxy(family("u|wf|1|FAM", None)).unwrap();
        tree.add_task_proxy(task("u|wf|1|a", Some("u|wf|1|FAM"), "running"))
            .unwrap();
        tree.add_job(job("u|wf|1|a|1", "u|wf|1|a", 1)).unwrap();

        assert!(tree.remove_family_proxy("u|wf|1|FAM").unwrap());

        assert!(!tree.contains("u|wf|1|a"));
        assert!(!tree.contains("u|wf|1|a|1"));
        assert!(tree.children("u|wf|1").is_empty());
        assert!(!tree.remove_family_proxy("u|wf|1|FAM").unwrap());
    }

    #[test]
    fn remove_checks_kind() {
        let mut tree = rooted();
        tree.add_task_proxy(task("u|wf|1|a", None, "running")).unwrap();
        assert!(matches!(tree.remove_job("u|wf|1|a"), Err(StoreError::KindMismatch { .. })));
        assert!(tree.contains("u|wf|1|a"));
        assert!(!tree.remove_job("absent").unwrap());
    }

    #[test]
    fn pruning_root_family_removes_cycle_point() {
        let mut tree = rooted();
        tree.add_task_proxy(task("u|wf|1|a", None, "running")).unwrap();

        assert!(tree.remove_family_proxy("u|wf|1").unwrap());

        assert_eq!(tree.cycle_points().count(), 0);
        assert!(tree.cycle_point_for("1").is_none());
        assert_eq!(tree.len(), 0);
        assert!(!tree.is_empty());
    }

    #[test]
    fn clear_resets_everything() {
        let mut tree = rooted();
        tree.add_task_proxy(task("u|wf|1|a", None, "running")).unwrap();
        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
        assert!(tree.cycle_point_for("1").is_none());
    }
}
