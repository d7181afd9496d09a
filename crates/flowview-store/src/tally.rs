//! Cycle point state tallies
//!
//! Tallies are derived data: they are recomputed from the tree after a batch,
//! never patched as individual tasks change.

use crate::node::TreeNode;
use crate::tree::WorkflowTree;
use flowview_model::{group_state, NodeId, StateTally, TaskProxyNode};

impl WorkflowTree {
    /// Recompute every cycle point's per-state task counts and group state
    pub fn tally_cycle_point_states(&mut self) {
        let tallies: Vec<(NodeId, StateTally)> = self
            .cycle_points()
            .map(|point| (point.id.clone(), self.state_tally(point.id.as_str())))
            .collect();

        for (id, tally) in tallies {
            if let Some(TreeNode::CyclePoint(point)) = self.node_entry_mut(&id) {
                point.state = group_state(tally.keys().copied());
                point.state_totals = tally;
            }
        }
    }

    /// Count the tasks below a node by state; stateless tasks are skipped
    #[must_use]
    pub fn state_tally(&self, id: &str) -> StateTally {
        let mut tally = StateTally::new();
        for state in self.descendant_tasks(id).into_iter().filter_map(|task| task.state) {
            *tally.entry(state).or_default() += 1;
        }
        tally
    }

    /// Tasks below a node, through any depth of families, in display order
    #[must_use]
    pub fn descendant_tasks(&self, id: &str) -> Vec<&TaskProxyNode> {
        let mut tasks = Vec::new();
        let mut pending: Vec<&NodeId> = self.children(id).iter().rev().collect();
        while let Some(child) = pending.pop() {
            let Some(entry) = self.entry(child.as_str()) else {
                continue;
            };
            match entry.node() {
                TreeNode::TaskProxy(task) => tasks.push(task),
                TreeNode::FamilyProxy(_) => pending.extend(entry.children().iter().rev()),
                TreeNode::CyclePoint(_) | TreeNode::Job(_) => {}
            }
        }
        tasks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowview_model::{normalize, TaskState};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn tree_with(tasks: &[(&str, Option<&str>, &str)]) -> WorkflowTree {
        let mut tree = WorkflowTree::new();
        tree.set_workflow(normalize::create_workflow_node(&json!({"id": "wf"})).unwrap())
            .unwrap();
        tree.add_cycle_point(
            normalize::create_cycle_point_node(&json!({"id": "wf|1", "cyclePoint": "1"}))
                .unwrap(),
        )
        .unwrap();
        tree.add_family_proxy(
            normalize::create_family_proxy_node(&json!({"id": "wf|1|FAM", "cyclePoint": "1"}))
                .unwrap(),
        )
        .unwrap();
        for (id, parent, state) in tasks {
            let raw = json!({
                "id": id,
                "cyclePoint": "1",
                "state": state,
                "firstParent": parent.map(|p| json!({"id": p}))
            });
            tree.add_task_proxy(normalize::create_task_proxy_node(&raw).unwrap())
                .unwrap();
        }
        tree
    }

    #[test]
    fn tally_counts_nested_tasks() {
        let mut tree = tree_with(&[
            ("wf|1|a", None, "running"),
            ("wf|1|b", Some("wf|1|FAM"), "running"),
            ("wf|1|c", Some("wf|1|FAM"), "failed"),
            ("wf|1|d", None, ""),
        ]);

        tree.tally_cycle_point_states();

        let point = tree.cycle_point_for("1").unwrap();
        assert_eq!(point.state_totals.get(&TaskState::Running), Some(&2));
        assert_eq!(point.state_totals.get(&TaskState::Failed), Some(&1));
        assert_eq!(point.task_count(), 3);
        assert_eq!(point.state, Some(TaskState::Failed));
    }

    #[test]
    fn tally_is_idempotent() {
        let mut tree = tree_with(&[("wf|1|a", None, "succeeded")]);
        tree.tally_cycle_point_states();
        let first = tree.cycle_point_for("1").cloned();
        tree.tally_cycle_point_states();
        assert_eq!(tree.cycle_point_for("1").cloned(), first);
    }

    #[test]
    fn empty_cycle_point_has_no_state() {
        let mut tree = tree_with(&[]);
        tree.tally_cycle_point_states();
        let point = tree.cycle_point_for("1").unwrap();
        assert!(point.state_totals.is_empty());
        assert_eq!(point.state, None);
    }

    #[test]
    fn descendant_tasks_in_display_order() {
        let tree = tree_with(&[
            ("wf|1|a", None, "waiting"),
            ("wf|1|b", Some("wf|1|FAM"), "waiting"),
        ]);
        let ids: Vec<_> = tree
            .descendant_tasks("wf|1")
            .into_iter()
            .map(|task| task.id.as_str())
            .collect();
        assert_eq!(ids, ["wf|1|b", "wf|1|a"]);
    }
}
