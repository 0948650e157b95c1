//! Subscriber interface for the reactive system.
//!
//! A subscriber is anything the runtime can invalidate: in practice a
//! [`Computed`](super::Computed) node. The runtime holds subscribers weakly
//! and only ever asks two things of them.

use crate::graph::NodeId;

/// A computation the runtime can mark stale.
pub trait Subscriber {
    /// Identity used as the node side of dependency edges.
    fn node_id(&self) -> NodeId;

    /// Called after the runtime has dropped all of this node's edges because
    /// one of its dependencies changed.
    fn mark_dirty(&self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Flag {
        id: NodeId,
        dirty: Cell<bool>,
    }

    impl Subscriber for Flag {
        fn node_id(&self) -> NodeId {
            self.id
        }

        fn mark_dirty(&self) {
            self.dirty.set(true);
        }
    }

    #[test]
    fn trait_objects_dispatch() {
        let flag = Flag { id: NodeId::new(), dirty: Cell::new(false) };
        let subscriber: &dyn Subscriber = &flag;

        subscriber.mark_dirty();
        assert!(flag.dirty.get());
        assert_eq!(subscriber.node_id(), flag.id);
    }
}
