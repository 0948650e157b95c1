//! Watch Implementation
//!
//! A watch turns a computation into an old/new change callback. The selector
//! runs once up front to record its dependencies; after that, every batch of
//! changes to what it read produces one handler call from the scheduler, with
//! the freshly selected value and the one selected before the batch.
//!
//! Deep watches snapshot the selected value inside the selector, so the
//! handler sees structural copies and the watch depends on every key the
//! snapshot visited.

use std::fmt;
use std::rc::Rc;

use tracing::warn;

use super::computed::{Computed, ComputedHooks};
use super::context::untracked;
use crate::config::WatchOptions;
use crate::error::Result;
use crate::value::Snapshot;

/// Handle returned by [`watch`]. Disposes the watch when dropped.
#[must_use = "dropping a WatchHandle stops the watch"]
pub struct WatchHandle<T: Clone + 'static> {
    node: Computed<T>,
}

impl<T: Clone + 'static> WatchHandle<T> {
    /// Stop the watch. No further handler calls happen, including ones
    /// already queued.
    pub fn dispose(self) {
        drop(self);
    }

    pub fn is_active(&self) -> bool {
        !self.node.is_disposed()
    }

    /// The computation backing this watch.
    pub fn computed(&self) -> &Computed<T> {
        &self.node
    }
}

impl<T: Clone + 'static> Drop for WatchHandle<T> {
    fn drop(&mut self) {
        self.node.dispose();
    }
}

impl<T: Clone + 'static> fmt::Debug for WatchHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchHandle").field("node", &self.node).finish()
    }
}

/// Call `handler(new, previous)` whenever what `selector` reads changes.
///
/// The selector runs immediately to learn its dependencies; an error from
/// that first run is returned. With `immediate`, the handler is also called
/// right away with `(initial, None)`.
pub fn watch<T, S, H>(selector: S, handler: H, options: WatchOptions) -> Result<WatchHandle<T>>
where
    T: Snapshot + 'static,
    S: Fn() -> Result<T> + 'static,
    H: Fn(&T, Option<&T>) + 'static,
{
    let read = move || -> Result<T> {
        let value = selector()?;
        Ok(if options.deep { value.snapshot() } else { value })
    };

    let handler = Rc::new(handler);
    let on_change = Rc::clone(&handler);
    let hooks = ComputedHooks::new().on_change(move |node: &Computed<T>, previous: Option<T>| {
        match node.get() {
            Ok(Some(value)) => on_change(&value, previous.as_ref()),
            Ok(None) => {}
            Err(err) => warn!(node = %node.id(), error = %err, "watch selector failed"),
        }
    });

    let node = Computed::builder(read).hooks(hooks).build();
    let handle = WatchHandle { node };

    let initial = handle.node.get()?;
    if let (true, Some(initial)) = (options.immediate, initial) {
        // Reads made by the handler belong to nobody.
        untracked(|| handler(&initial, None));
    }
    Ok(handle)
}
