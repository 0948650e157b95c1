//! Computed Implementation
//!
//! A Computed is a derived value that discovers its own dependencies.
//!
//! # How Computeds Work
//!
//! 1. On first access, the node runs its read function inside a reactive
//!    context. Every tracked read made during the run becomes an edge.
//!
//! 2. When accessed again, if no dependency has been written, the cached
//!    value is returned without running anything.
//!
//! 3. When a dependency is written, the runtime drops all of the node's edges
//!    and calls `mark_dirty`. The node fires its immediate-change hook,
//!    invalidates computations that read *it*, and defers its change hook to
//!    the scheduler.
//!
//! 4. The next access re-runs the read function and learns a fresh set of
//!    edges.
//!
//! # State Machine
//!
//! `Dirty -> Fresh` on a successful run, `Fresh -> Dirty` on invalidation,
//! anything `-> Disposed`. A failed run leaves the node `Dirty`, so the next
//! read retries. The edges it recorded before failing stay live: a write to
//! one of them invalidates the node again as if it were `Fresh`. Uncached
//! nodes run on every read but still move to `Fresh` so they keep receiving
//! invalidations.
//!
//! # Batching
//!
//! Any number of invalidations between two drains produce one change
//! notification, carrying the value cached before the first of them.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

use super::context::ReactiveContext;
use super::runtime::Runtime;
use super::subscriber::Subscriber;
use crate::config::ComputedOptions;
use crate::error::{Error, Result};
use crate::graph::{Key, NodeId, NodeState, Scheduler, TargetId};

type ReadFn<T> = Box<dyn Fn() -> Result<T>>;
type WriteFn<T> = Box<dyn Fn(T) -> Result<()>>;

/// Callbacks fired by a [`Computed`] over its lifetime.
pub struct ComputedHooks<T: Clone + 'static> {
    on_get: Option<Rc<dyn Fn(&T)>>,
    on_set: Option<Rc<dyn Fn(&T)>>,
    on_immediate_change: Option<Rc<dyn Fn(&Computed<T>)>>,
    on_change: Option<Rc<dyn Fn(&Computed<T>, Option<T>)>>,
}

impl<T: Clone + 'static> ComputedHooks<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fired after every successful read, cache hits included.
    pub fn on_get(mut self, hook: impl Fn(&T) + 'static) -> Self {
        self.on_get = Some(Rc::new(hook));
        self
    }

    /// Fired after the write function succeeds.
    pub fn on_set(mut self, hook: impl Fn(&T) + 'static) -> Self {
        self.on_set = Some(Rc::new(hook));
        self
    }

    /// Fired synchronously when the node becomes dirty.
    pub fn on_immediate_change(mut self, hook: impl Fn(&Computed<T>) + 'static) -> Self {
        self.on_immediate_change = Some(Rc::new(hook));
        self
    }

    /// Fired from the scheduler with the value cached before the change.
    /// Read the node to get the new one.
    pub fn on_change(mut self, hook: impl Fn(&Computed<T>, Option<T>) + 'static) -> Self {
        self.on_change = Some(Rc::new(hook));
        self
    }
}

impl<T: Clone + 'static> Default for ComputedHooks<T> {
    fn default() -> Self {
        Self {
            on_get: None,
            on_set: None,
            on_immediate_change: None,
            on_change: None,
        }
    }
}

impl<T: Clone + 'static> Clone for ComputedHooks<T> {
    fn clone(&self) -> Self {
        Self {
            on_get: self.on_get.clone(),
            on_set: self.on_set.clone(),
            on_immediate_change: self.on_immediate_change.clone(),
            on_change: self.on_change.clone(),
        }
    }
}

struct ComputedInner<T: Clone + 'static> {
    id: NodeId,
    /// Target other computations depend on when they read this node.
    cell: TargetId,
    read: ReadFn<T>,
    write: Option<WriteFn<T>>,
    options: ComputedOptions,
    hooks: ComputedHooks<T>,
    state: Cell<NodeState>,
    value: RefCell<Option<T>>,
    previous: RefCell<Option<T>>,
    /// A change notification is queued and has not run yet.
    scheduled: Cell<bool>,
    /// The latest run returned an error.
    failed: Cell<bool>,
    weak_self: Weak<ComputedInner<T>>,
}

impl<T: Clone + 'static> ComputedInner<T> {
    fn handle(&self) -> Option<Computed<T>> {
        self.weak_self.upgrade().map(|inner| Computed { inner })
    }

    fn name(&self) -> String {
        self.options
            .label
            .clone()
            .unwrap_or_else(|| self.id.to_string())
    }

    fn cached(&self) -> Option<T> {
        if !self.options.cache || self.state.get() != NodeState::Fresh {
            return None;
        }
        self.value.borrow().clone()
    }

    fn evaluate(&self) -> Result<T> {
        Runtime::clear_dependencies(self.id);

        let result = {
            let _ctx = ReactiveContext::enter(self.id);
            (self.read)()
        };
        if self.state.get() == NodeState::Disposed {
            return result;
        }
        self.failed.set(result.is_err());
        let value = result?;

        if self.options.cache {
            *self.value.borrow_mut() = Some(value.clone());
        }
        self.state.set(NodeState::Fresh);
        trace!(node = %self.id, edges = Runtime::dependency_count(self.id), "evaluated");
        Ok(value)
    }

    fn settle(&self) {
        self.scheduled.set(false);
        let previous = self.previous.borrow_mut().take();
        if self.state.get() == NodeState::Disposed {
            return;
        }

        if let (Some(hook), Some(node)) = (&self.hooks.on_change, self.handle()) {
            hook(&node, previous);
        }
    }
}

impl<T: Clone + 'static> Subscriber for ComputedInner<T> {
    fn node_id(&self) -> NodeId {
        self.id
    }

    fn mark_dirty(&self) {
        match self.state.get() {
            NodeState::Fresh => {}
            NodeState::Dirty if self.failed.get() => {}
            _ => return,
        }
        self.failed.set(false);
        self.state.set(NodeState::Dirty);
        trace!(node = %self.id, "marked dirty");

        if let (Some(hook), Some(node)) = (&self.hooks.on_immediate_change, self.handle()) {
            hook(&node);
        }
        Runtime::notify(self.cell, &Key::Cell);

        if self.hooks.on_change.is_none() || self.scheduled.replace(true) {
            return;
        }
        *self.previous.borrow_mut() = self.value.borrow().clone();

        let weak = self.weak_self.clone();
        Scheduler::enqueue(move || {
            if let Some(inner) = weak.upgrade() {
                inner.settle();
            }
        });
    }
}

impl<T: Clone + 'static> Drop for ComputedInner<T> {
    fn drop(&mut self) {
        Runtime::unregister(self.id);
        Runtime::forget_target(self.cell);
    }
}

/// A memoized computation with automatic dependency discovery.
///
/// Cloning yields another handle to the same node.
///
/// # Example
///
/// ```rust
/// use weft_core::{Computed, Record};
///
/// let state = Record::from_fields([("count", 1)]).instrument();
/// let reader = state.clone();
/// let doubled = Computed::new(move || {
///     reader.get("count").and_then(|v| v.as_int()).unwrap_or(0) * 2
/// });
///
/// assert_eq!(doubled.get().unwrap(), Some(2));
/// state.set("count", 5);
/// assert_eq!(doubled.get().unwrap(), Some(10));
/// ```
pub struct Computed<T: Clone + 'static> {
    inner: Rc<ComputedInner<T>>,
}

impl<T: Clone + 'static> Computed<T> {
    /// Create a cached computation from an infallible read function.
    ///
    /// The function is not run until the first read.
    pub fn new<F>(read: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self::builder(move || Ok(read())).build()
    }

    /// Create a cached computation from a fallible read function.
    pub fn try_new<F>(read: F) -> Self
    where
        F: Fn() -> Result<T> + 'static,
    {
        Self::builder(read).build()
    }

    /// Start building a computation with a write function, options, or
    /// hooks.
    pub fn builder<F>(read: F) -> ComputedBuilder<T>
    where
        F: Fn() -> Result<T> + 'static,
    {
        ComputedBuilder {
            read: Box::new(read),
            write: None,
            options: ComputedOptions::default(),
            hooks: ComputedHooks::default(),
        }
    }

    fn from_parts(read: ReadFn<T>, write: Option<WriteFn<T>>, options: ComputedOptions, hooks: ComputedHooks<T>) -> Self {
        let inner = Rc::new_cyclic(|weak_self| ComputedInner {
            id: NodeId::new(),
            cell: TargetId::new(),
            read,
            write,
            options,
            hooks,
            state: Cell::new(NodeState::Dirty),
            value: RefCell::new(None),
            previous: RefCell::new(None),
            scheduled: Cell::new(false),
            failed: Cell::new(false),
            weak_self: weak_self.clone(),
        });

        let weak: Weak<dyn Subscriber> = Rc::downgrade(&inner) as Weak<dyn Subscriber>;
        Runtime::register(weak, inner.id);
        Self { inner }
    }

    /// Get the node's unique ID.
    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Read the value, re-running the read function if needed.
    ///
    /// Returns `Ok(None)` once the node is disposed. Errors from the read
    /// function are returned unchanged and leave the node dirty.
    pub fn get(&self) -> Result<Option<T>> {
        let inner = &self.inner;
        if inner.state.get() == NodeState::Disposed {
            return Ok(None);
        }
        Runtime::depend_on(inner.cell, || Key::Cell);

        let value = match inner.cached() {
            Some(value) => value,
            None => inner.evaluate()?,
        };

        if let Some(hook) = &inner.hooks.on_get {
            hook(&value);
        }
        Ok(Some(value))
    }

    /// Pass `value` to the write function.
    pub fn set(&self, value: T) -> Result<()> {
        let inner = &self.inner;
        let Some(write) = &inner.write else {
            return Err(Error::ReadOnly { name: inner.name() });
        };

        let Some(hook) = &inner.hooks.on_set else {
            return write(value);
        };
        write(value.clone())?;
        hook(&value);
        Ok(())
    }

    /// Drop every edge and stop evaluating. Terminal.
    pub fn dispose(&self) {
        let inner = &self.inner;
        Runtime::clear_dependencies(inner.id);
        inner.state.set(NodeState::Disposed);
        inner.value.borrow_mut().take();
        inner.previous.borrow_mut().take();
        trace!(node = %inner.id, "disposed");
    }

    pub fn state(&self) -> NodeState {
        self.inner.state.get()
    }

    pub fn is_dirty(&self) -> bool {
        self.state() == NodeState::Dirty
    }

    pub fn is_disposed(&self) -> bool {
        self.state() == NodeState::Disposed
    }

    /// Check if the node holds a cached value.
    pub fn has_value(&self) -> bool {
        self.inner.value.borrow().is_some()
    }

    /// Whether a write function was supplied.
    pub fn is_writable(&self) -> bool {
        self.inner.write.is_some()
    }

    pub fn label(&self) -> Option<&str> {
        self.inner.options.label.as_deref()
    }

    /// Number of (target, key) pairs read during the latest run.
    pub fn dependency_count(&self) -> usize {
        Runtime::dependency_count(self.inner.id)
    }

    /// Number of computations that read this node during their latest run.
    pub fn dependent_count(&self) -> usize {
        Runtime::dependent_count(self.inner.cell, &Key::Cell)
    }
}

impl<T: Clone + 'static> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.inner.id)
            .field("label", &self.inner.options.label)
            .field("state", &self.state())
            .field("has_value", &self.has_value())
            .finish()
    }
}

/// Builder for a [`Computed`] with a write function, options, or hooks.
pub struct ComputedBuilder<T: Clone + 'static> {
    read: ReadFn<T>,
    write: Option<WriteFn<T>>,
    options: ComputedOptions,
    hooks: ComputedHooks<T>,
}

impl<T: Clone + 'static> ComputedBuilder<T> {
    pub fn write<F>(mut self, write: F) -> Self
    where
        F: Fn(T) -> Result<()> + 'static,
    {
        self.write = Some(Box::new(write));
        self
    }

    pub fn cache(mut self, cache: bool) -> Self {
        self.options.cache = cache;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.options.label = Some(label.into());
        self
    }

    pub fn options(mut self, options: ComputedOptions) -> Self {
        self.options = options;
        self
    }

    pub fn hooks(mut self, hooks: ComputedHooks<T>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn build(self) -> Computed<T> {
        Computed::from_parts(self.read, self.write, self.options, self.hooks)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Signal;

    fn counter() -> (Rc<Cell<usize>>, Rc<Cell<usize>>) {
        let count = Rc::new(Cell::new(0));
        (count.clone(), count)
    }

    #[test]
    fn computes_on_first_access() {
        let (calls, calls_clone) = counter();
        let node = Computed::new(move || {
            calls_clone.set(calls_clone.get() + 1);
            42
        });

        assert!(!node.has_value());
        assert!(node.is_dirty());
        assert_eq!(calls.get(), 0);

        assert_eq!(node.get().unwrap(), Some(42));
        assert_eq!(calls.get(), 1);
        assert!(node.has_value());
        assert_eq!(node.state(), NodeState::Fresh);
    }

    #[test]
    fn caches_until_a_dependency_changes() {
        let source = Signal::new(1);
        let (calls, calls_clone) = counter();
        let reader = source.clone();
        let node = Computed::new(move || {
            calls_clone.set(calls_clone.get() + 1);
            reader.get() * 2
        });

        for _ in 0..5 {
            assert_eq!(node.get().unwrap(), Some(2));
        }
        assert_eq!(calls.get(), 1);

        source.set(3);
        assert!(node.is_dirty());
        assert_eq!(node.get().unwrap(), Some(6));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn uncached_runs_every_read_and_still_invalidates() {
        let source = Signal::new(1);
        let (calls, calls_clone) = counter();
        let (changes, changes_clone) = counter();
        let reader = source.clone();
        let node = Computed::builder(move || {
            calls_clone.set(calls_clone.get() + 1);
            Ok(reader.get())
        })
        .cache(false)
        .hooks(ComputedHooks::new().on_change(move |_, _| changes_clone.set(changes_clone.get() + 1)))
        .build();

        node.get().unwrap();
        node.get().unwrap();
        assert_eq!(calls.get(), 2);
        assert!(!node.has_value());

        source.set(2);
        Scheduler::flush();
        assert_eq!(changes.get(), 1);

        node.get().unwrap();
        source.set(3);
        Scheduler::flush();
        assert_eq!(changes.get(), 2);
    }

    #[test]
    fn failed_read_keeps_node_dirty_and_stack_clean() {
        let fail = Signal::new(true);
        let reader = fail.clone();
        let node = Computed::try_new(move || {
            if reader.get() {
                return Err(Error::msg("boom"));
            }
            Ok(1)
        });

        let err = node.get().unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert!(node.is_dirty());
        assert_eq!(ReactiveContext::depth(), 0);

        fail.set(false);
        assert_eq!(node.get().unwrap(), Some(1));
    }

    #[test]
    fn write_after_failed_run_invalidates_again() {
        let source = Signal::new(1);
        let reader = source.clone();
        let (immediate, immediate_clone) = counter();
        let (changes, changes_clone) = counter();
        let node = Computed::builder(move || match reader.get() {
            2 => Err(Error::msg("two")),
            n => Ok(n),
        })
        .hooks(
            ComputedHooks::new()
                .on_immediate_change(move |_| immediate_clone.set(immediate_clone.get() + 1))
                .on_change(move |_, _| changes_clone.set(changes_clone.get() + 1)),
        )
        .build();

        node.get().unwrap();
        source.set(2);
        Scheduler::flush();
        assert!(node.get().is_err());
        assert_eq!(node.dependency_count(), 1);
        assert_eq!((immediate.get(), changes.get()), (1, 1));

        source.set(3);
        assert_eq!(Scheduler::len(), 1);
        Scheduler::flush();
        assert_eq!((immediate.get(), changes.get()), (2, 2));
        assert_eq!(node.get().unwrap(), Some(3));
    }

    #[test]
    fn on_get_fires_on_cache_hits() {
        let (gets, gets_clone) = counter();
        let node = Computed::builder(|| Ok(7))
            .hooks(ComputedHooks::new().on_get(move |v: &i32| {
                assert_eq!(*v, 7);
                gets_clone.set(gets_clone.get() + 1);
            }))
            .build();

        node.get().unwrap();
        node.get().unwrap();
        assert_eq!(gets.get(), 2);
    }

    #[test]
    fn write_without_write_fn_is_read_only() {
        let node = Computed::builder(|| Ok(1)).label("total").build();
        let err = node.set(2).unwrap_err();

        assert!(matches!(err, Error::ReadOnly { ref name } if name == "total"));
        assert!(!node.is_writable());
    }

    #[test]
    fn write_fn_and_on_set() {
        let source = Signal::new(1);
        let (reader, writer) = (source.clone(), source.clone());
        let seen = Rc::new(Cell::new(0));
        let seen_clone = seen.clone();

        let node = Computed::builder(move || Ok(reader.get() * 10))
            .write(move |v: i64| {
                writer.set(v / 10);
                Ok(())
            })
            .hooks(ComputedHooks::new().on_set(move |v: &i64| seen_clone.set(*v)))
            .build();

        assert_eq!(node.get().unwrap(), Some(10));
        node.set(50).unwrap();
        assert_eq!(seen.get(), 50);
        assert_eq!(node.get().unwrap(), Some(50));
    }

    #[test]
    fn dispose_is_terminal() {
        let source = Signal::new(1);
        let reader = source.clone();
        let node = Computed::new(move || reader.get());

        node.get().unwrap();
        assert_eq!(node.dependency_count(), 1);

        node.dispose();
        assert!(node.is_disposed());
        assert!(!node.has_value());
        assert_eq!(node.dependency_count(), 0);
        assert_eq!(node.get().unwrap(), None);

        source.set(2);
        assert!(node.is_disposed());
    }

    #[test]
    fn nested_computations_propagate() {
        let source = Signal::new(2);
        let reader = source.clone();
        let inner = Computed::new(move || reader.get() + 1);
        let inner_reader = inner.clone();
        let outer = Computed::try_new(move || Ok(inner_reader.get()?.unwrap_or(0) * 10));

        assert_eq!(outer.get().unwrap(), Some(30));
        assert_eq!(inner.dependent_count(), 1);

        source.set(4);
        assert!(inner.is_dirty());
        assert!(outer.is_dirty());
        assert_eq!(outer.get().unwrap(), Some(50));
    }

    #[test]
    fn one_notification_per_batch_with_first_previous() {
        let source = Signal::new(1);
        let reader = source.clone();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();

        let node = Computed::builder(move || Ok(reader.get()))
            .hooks(ComputedHooks::new().on_change(move |node: &Computed<i32>, previous| {
                let current = node.get().unwrap();
                seen_clone.borrow_mut().push((previous, current));
            }))
            .build();

        node.get().unwrap();
        source.set(2);
        source.set(3);
        node.get().unwrap();
        source.set(4);
        assert_eq!(Scheduler::len(), 1);

        Scheduler::flush();
        assert_eq!(*seen.borrow(), vec![(Some(1), Some(4))]);
    }

    #[test]
    fn immediate_change_fires_synchronously() {
        let source = Signal::new(1);
        let reader = source.clone();
        let (fired, fired_clone) = counter();
        let node = Computed::builder(move || Ok(reader.get()))
            .hooks(ComputedHooks::new().on_immediate_change(move |_| fired_clone.set(fired_clone.get() + 1)))
            .build();

        node.get().unwrap();
        source.set(2);
        source.set(3);
        assert_eq!(fired.get(), 1);
        assert_eq!(Scheduler::len(), 0);
    }

    #[test]
    fn dropping_the_node_releases_its_edges() {
        let source = Signal::new(1);
        let reader = source.clone();
        let node = Computed::new(move || reader.get());
        node.get().unwrap();
        assert_eq!(source.subscriber_count(), 1);

        drop(node);
        assert_eq!(source.subscriber_count(), 0);
    }
}
