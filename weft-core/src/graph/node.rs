//! Graph Identities
//!
//! This module defines the identifiers and keys that label both sides of a
//! dependency edge: computation nodes on one side, (target, key) pairs on the
//! other.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a computation node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Unique identifier for a tracked target.
///
/// Every raw container, single-value cell, and computation node owns one.
/// Dependency edges are keyed by target rather than by facade, so every
/// facade of the same target observes the same edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(u64);

impl TargetId {
    /// Generate a new unique target ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for TargetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target#{}", self.0)
    }
}

/// Identity-only projection of a [`Value`](crate::Value) used as a map key or
/// set member.
///
/// Primitives are kept by value. Containers are reduced to their target id so
/// a recorded edge never keeps a container alive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntryKey {
    Null,
    Bool(bool),
    Int(i64),
    /// Normalized bit pattern (all NaNs equal, `-0.0 == 0.0`).
    Float(u64),
    Str(String),
    Target(TargetId),
}

/// The key half of a dependency edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A named record field.
    Field(String),

    /// A sequence element.
    Index(usize),

    /// A map entry or set member.
    Entry(EntryKey),

    /// The length of a sequence.
    Length,

    /// The value held by a single-value cell or produced by a computation.
    Cell,

    /// The key set as a whole: membership tests, enumeration, size.
    KeySet,
}

impl Key {
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }
}

/// Lifecycle state of a computation node.
///
/// Transitions: `Dirty -> Fresh` on a successful run, `Fresh -> Dirty` when a
/// dependency changes, and anything `-> Disposed`, which is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// The cached value reflects the current dependencies.
    Fresh,

    /// A dependency changed (or the node never ran). The next read re-runs.
    Dirty,

    /// The node no longer evaluates. Reads return nothing.
    Disposed,
}
