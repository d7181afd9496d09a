//! Flowview Model
//!
//! Wire payloads and normalized records for a workflow's execution state.
//!
//! # Core Concepts
//!
//! - [`Deltas`]: One batch of added/updated/pruned instructions plus a shutdown flag
//! - [`EntityKind`]: Closed set of entity kinds a batch can carry
//! - [`NodeId`]: Globally unique identifier assigned upstream
//! - [`TaskState`]: Task and job lifecycle states
//! - Node records ([`WorkflowNode`], [`CyclePointNode`], [`FamilyProxyNode`],
//!   [`TaskProxyNode`], [`JobNode`]) produced by the [`normalize`] functions
//! - [`Merge`]: Field-by-field merge used by update deltas
//!
//! # Example
//!
//! ```rust,ignore
//! use flowview_model::{normalize, Deltas};
//!
//! let deltas: Deltas = serde_json::from_str(line)?;
//! if let Some(added) = &deltas.added {
//!     for raw in added.items(EntityKind::TaskProxy) {
//!         let node = normalize::create_task_proxy_node(raw)?;
//!         println!("{}", node.id);
//!     }
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod deltas;
mod id;
mod kind;
pub mod merge;
mod node;
pub mod normalize;
mod state;

pub use deltas::{snapshot_items, task_jobs, Deltas, DeltasAdded, DeltasPruned, DeltasUpdated};
pub use id::NodeId;
pub use kind::EntityKind;
pub use merge::{merge_json, Merge};
pub use node::{CyclePointNode, FamilyProxyNode, JobNode, TaskProxyNode, WorkflowNode};
pub use normalize::NormalizeError;
pub use state::{group_state, ParseStateError, StateTally, TaskState};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
