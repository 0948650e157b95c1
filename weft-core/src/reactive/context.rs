//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! This enables automatic dependency tracking: when a tracked key is read,
//! the runtime can link it to the current computation.
//!
//! # Implementation
//!
//! We use a thread-local stack of frames. Entering a computation pushes its
//! node ID; [`untracked`] pushes a frame that suspends recording. The frame is
//! popped by a guard on drop, so the stack stays balanced when a computation
//! returns an error or panics.
//!
//! This design supports nested reactive contexts (e.g., a computation that
//! reads another computation).

use std::cell::RefCell;

use smallvec::SmallVec;

use crate::graph::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Node(NodeId),
    Untracked,
}

thread_local! {
    static CONTEXT_STACK: RefCell<SmallVec<[Frame; 8]>> = RefCell::new(SmallVec::new());
}

/// Guard that pops the context when dropped.
pub struct ReactiveContext {
    frame: Frame,
}

impl ReactiveContext {
    /// Enter a new reactive context for the given node.
    ///
    /// While this context is active, tracked reads link to `node`. The
    /// context is exited when the returned guard is dropped.
    pub fn enter(node: NodeId) -> Self {
        Self::push(Frame::Node(node))
    }

    /// Enter a frame in which no reads are recorded.
    pub fn suspend() -> Self {
        Self::push(Frame::Untracked)
    }

    fn push(frame: Frame) -> Self {
        CONTEXT_STACK.with(|stack| stack.borrow_mut().push(frame));
        Self { frame }
    }

    /// Check if reads are currently being recorded.
    pub fn is_active() -> bool {
        Self::current_subscriber().is_some()
    }

    /// Get the node whose evaluation is currently recording reads, if any.
    pub fn current_subscriber() -> Option<NodeId> {
        CONTEXT_STACK.with(|stack| match stack.borrow().last() {
            Some(Frame::Node(id)) => Some(*id),
            _ => None,
        })
    }

    /// Number of frames on the stack.
    pub fn depth() -> usize {
        CONTEXT_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        let _ = CONTEXT_STACK.try_with(|stack| {
            let popped = stack.borrow_mut().pop();

            debug_assert_eq!(
                popped,
                Some(self.frame),
                "ReactiveContext mismatch: expected {:?}, got {:?}",
                self.frame,
                popped
            );
        });
    }
}

/// Run `f` without recording any dependencies.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let _ctx = ReactiveContext::suspend();
    f()
}
