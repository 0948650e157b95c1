//! Reactive Runtime
//!
//! The runtime is the dependency graph registry. It connects instrumented
//! targets to the computations that read them and routes invalidations when
//! they are written.
//!
//! # How It Works
//!
//! 1. When a computation is created, it registers with the runtime.
//!
//! 2. When a tracked key is read while a computation is evaluating, the
//!    runtime records the edge in both directions.
//!
//! 3. When a tracked key is written, the runtime:
//!    a. Finds every computation that depends on it
//!    b. Drops all of each computation's edges (it must re-run to learn its
//!       new dependencies)
//!    c. Marks each computation dirty, which defers its change notification
//!       to the scheduler
//!
//! The registry also owns the target -> facade association so instrumenting
//! the same target twice hands back the same facade.
//!
//! # Threading
//!
//! The registry is thread-local and holds subscribers and facades weakly.
//! A host that evaluates on several threads gets independent graphs; shared
//! state must be funnelled through one evaluation thread.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use indexmap::IndexSet;
use smallvec::SmallVec;
use tracing::{debug, trace};

use super::context::ReactiveContext;
use super::subscriber::Subscriber;
use crate::graph::{Key, NodeId, TargetId};
use crate::instrument::Facade;

#[derive(Default)]
struct Registry {
    /// target -> facade
    facades: HashMap<TargetId, Weak<Facade>>,
    /// (target, key) -> nodes that read it, in subscription order
    dependents: HashMap<TargetId, HashMap<Key, IndexSet<NodeId>>>,
    /// node -> (target, key) pairs it read during its latest run
    dependencies: HashMap<NodeId, IndexSet<(TargetId, Key)>>,
    /// node -> subscriber
    nodes: HashMap<NodeId, Weak<dyn Subscriber>>,
}

impl Registry {
    fn link(&mut self, node: NodeId, target: TargetId, key: Key) {
        let readers = self
            .dependents
            .entry(target)
            .or_default()
            .entry(key.clone())
            .or_default();
        if readers.insert(node) {
            self.dependencies.entry(node).or_default().insert((target, key));
        }
    }

    fn unlink(&mut self, node: NodeId) -> usize {
        let Some(edges) = self.dependencies.remove(&node) else {
            return 0;
        };
        let count = edges.len();

        for (target, key) in edges {
            let Some(keys) = self.dependents.get_mut(&target) else {
                continue;
            };
            if let Some(readers) = keys.get_mut(&key) {
                readers.shift_remove(&node);
                if readers.is_empty() {
                    keys.remove(&key);
                }
            }
            if keys.is_empty() {
                self.dependents.remove(&target);
            }
        }
        count
    }

    fn forget(&mut self, target: TargetId) {
        self.facades.remove(&target);

        let Some(keys) = self.dependents.remove(&target) else {
            return;
        };
        for (key, readers) in keys {
            let edge = (target, key);
            for node in readers {
                if let Some(edges) = self.dependencies.get_mut(&node) {
                    edges.shift_remove(&edge);
                    if edges.is_empty() {
                        self.dependencies.remove(&node);
                    }
                }
            }
        }
    }
}

thread_local! {
    static REGISTRY: RefCell<Registry> = RefCell::new(Registry::default());
}

/// Mutably borrow the registry from a cleanup path.
///
/// Cleanup runs from `Drop`, which may happen while the registry is already
/// borrowed or after the thread-local is gone. Both cases skip the cleanup
/// and leave a trace, since the skipped edges stay behind until their target
/// or node is forgotten again.
fn with_registry_mut(op: &'static str, f: impl FnOnce(&mut Registry)) {
    let outcome = REGISTRY.try_with(|registry| match registry.try_borrow_mut() {
        Ok(mut registry) => {
            f(&mut registry);
            true
        }
        Err(_) => false,
    });
    match outcome {
        Ok(true) => {}
        Ok(false) => trace!(op, "registry busy, cleanup skipped"),
        Err(_) => trace!(op, "registry torn down, cleanup skipped"),
    }
}

/// The thread-local dependency graph registry.
pub struct Runtime;

impl Runtime {
    /// Register a computation so notifications can reach it.
    pub fn register(node: Weak<dyn Subscriber>, id: NodeId) {
        REGISTRY.with(|registry| {
            registry.borrow_mut().nodes.insert(id, node);
        });
    }

    /// Unregister a computation and drop all of its edges.
    pub fn unregister(id: NodeId) {
        with_registry_mut("unregister", |registry| {
            registry.unlink(id);
            registry.nodes.remove(&id);
        });
    }

    /// Record that the currently evaluating computation read `key` of
    /// `target`.
    ///
    /// With no computation evaluating this returns without building the key.
    pub fn depend_on(target: TargetId, key: impl FnOnce() -> Key) {
        let Some(node) = ReactiveContext::current_subscriber() else {
            return;
        };
        let key = key();
        trace!(%node, %target, ?key, "dependency recorded");

        REGISTRY.with(|registry| registry.borrow_mut().link(node, target, key));
    }

    /// Invalidate every computation that read `key` of `target`.
    ///
    /// Each affected computation loses all of its edges and is marked dirty.
    pub fn notify(target: TargetId, key: &Key) {
        let affected: SmallVec<[Rc<dyn Subscriber>; 4]> = REGISTRY.with(|registry| {
            let mut registry = registry.borrow_mut();
            let Some(readers) = registry.dependents.get(&target).and_then(|keys| keys.get(key))
            else {
                return SmallVec::new();
            };

            let ids: SmallVec<[NodeId; 4]> = readers.iter().copied().collect();
            let mut affected = SmallVec::new();
            for id in ids {
                registry.unlink(id);
                if let Some(node) = registry.nodes.get(&id).and_then(Weak::upgrade) {
                    affected.push(node);
                }
            }
            affected
        });

        if affected.is_empty() {
            return;
        }
        debug!(%target, ?key, dependents = affected.len(), "notifying dependents");

        for node in affected {
            node.mark_dirty();
        }
    }

    /// Remove all edges recorded for `node`.
    ///
    /// Called before re-running a computation to clear stale dependencies.
    pub fn clear_dependencies(node: NodeId) {
        with_registry_mut("clear_dependencies", |registry| {
            registry.unlink(node);
        });
    }

    /// Forget a dropped target: its facade association and every edge on it.
    pub fn forget_target(target: TargetId) {
        with_registry_mut("forget_target", |registry| registry.forget(target));
    }

    /// Associate `target` with its facade.
    pub(crate) fn associate(target: TargetId, facade: &Rc<Facade>) {
        REGISTRY.with(|registry| {
            registry.borrow_mut().facades.insert(target, Rc::downgrade(facade));
        });
    }

    /// Look up the live facade of `target`, if any.
    pub(crate) fn facade(target: TargetId) -> Option<Rc<Facade>> {
        REGISTRY.with(|registry| registry.borrow().facades.get(&target).and_then(Weak::upgrade))
    }

    /// Number of computations currently depending on `key` of `target`.
    pub fn dependent_count(target: TargetId, key: &Key) -> usize {
        REGISTRY.with(|registry| {
            registry
                .borrow()
                .dependents
                .get(&target)
                .and_then(|keys| keys.get(key))
                .map_or(0, IndexSet::len)
        })
    }

    /// Number of (target, key) pairs `node` currently depends on.
    pub fn dependency_count(node: NodeId) -> usize {
        REGISTRY.with(|registry| {
            registry.borrow().dependencies.get(&node).map_or(0, IndexSet::len)
        })
    }

    /// Get the computation currently recording reads, if any.
    pub fn current_subscriber() -> Option<NodeId> {
        ReactiveContext::current_subscriber()
    }

    /// Check if reads are currently being recorded.
    pub fn is_tracking() -> bool {
        ReactiveContext::is_active()
    }
}
