//! Dependency Graph
//!
//! This module holds the vocabulary of the dependency graph and the deferred
//! task scheduler.
//!
//! # Overview
//!
//! The graph is bipartite. One side is computation nodes, identified by
//! [`NodeId`]. The other side is (target, key) pairs: a [`TargetId`] names a
//! container, cell, or computation, and a [`Key`] names the part of it that
//! was read. An edge means "this node read this key of this target during its
//! most recent evaluation".
//!
//! The edge indexes themselves live in the runtime registry
//! ([`Runtime`](crate::reactive::Runtime)), which keeps both directions so
//! either side can be located in O(1).
//!
//! # Design Decisions
//!
//! 1. Edges are keyed by target, not facade, so a write through any facade of
//!    a target reaches every reader.
//!
//! 2. A node's edges are dropped whenever it is invalidated or re-evaluated,
//!    so the graph only ever reflects each node's latest run.
//!
//! 3. Change notifications are deferred to the [`Scheduler`], which batches
//!    every invalidation raised in one synchronous turn into one drain.

mod node;
mod scheduler;

pub use node::{EntryKey, Key, NodeId, NodeState, TargetId};
pub use scheduler::Scheduler;
