//! Flowview Store
//!
//! The hierarchical view of one workflow: a tree of cycle points, families,
//! tasks and jobs under a single workflow root, with an id index over every
//! node.
//!
//! # Core Concepts
//!
//! - [`WorkflowTree`]: The entity store; empty until a workflow root is set
//! - [`TreeNode`]: Closed union of node kinds held by the store
//! - [`TreeEntry`]: A node plus its parent and ordered children
//! - [`StoreError`]: Failures of individual store operations
//!
//! # Example
//!
//! ```rust,ignore
//! use flowview_store::WorkflowTree;
//!
//! let mut tree = WorkflowTree::new();
//! tree.set_workflow(workflow_node)?;
//! tree.add_cycle_point(point)?;
//! tree.add_task_proxy(task)?;
//! tree.tally_cycle_point_states();
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod node;
mod tally;
mod tree;

pub use error::StoreError;
pub use node::{TreeEntry, TreeNode};
pub use tree::WorkflowTree;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
