//! Signal Implementation
//!
//! A Signal is a single-value cell: the smallest instrumented target. It
//! holds a value under one key ([`Key::Cell`]) and follows the same rules as
//! container fields.
//!
//! # How Signals Work
//!
//! 1. When a signal is read within a computation, the runtime records an edge
//!    from the signal's target to that computation.
//!
//! 2. When a signal is written with a value that differs from the current
//!    one, every computation holding such an edge is invalidated.
//!
//! 3. Writing an equal value is not a change.

use std::fmt;
use std::rc::Rc;

use super::runtime::Runtime;
use crate::graph::{Key, TargetId};
use crate::instrument::Target;

/// A reactive cell holding a value of type `T`.
///
/// Cloning yields another handle to the same cell.
///
/// # Example
///
/// ```rust
/// use weft_core::{Computed, Signal};
///
/// let count = Signal::new(1);
/// let reader = count.clone();
/// let doubled = Computed::new(move || reader.get() * 2);
///
/// assert_eq!(doubled.get().unwrap(), Some(2));
/// count.set(5);
/// assert_eq!(doubled.get().unwrap(), Some(10));
/// ```
pub struct Signal<T> {
    target: Rc<Target<T>>,
}

impl<T: Clone + PartialEq + 'static> Signal<T> {
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            target: Target::new(value),
        }
    }

    /// Get the signal's target identity.
    pub fn id(&self) -> TargetId {
        self.target.id
    }

    /// Get the current value, recording a dependency if a computation is
    /// running.
    pub fn get(&self) -> T {
        Runtime::depend_on(self.target.id, || Key::Cell);
        self.target.data.borrow().clone()
    }

    /// Get the current value without recording a dependency.
    pub fn get_untracked(&self) -> T {
        self.target.data.borrow().clone()
    }

    /// Borrow the current value, recording a dependency.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        Runtime::depend_on(self.target.id, || Key::Cell);
        f(&self.target.data.borrow())
    }

    /// Set a new value, returning whether it changed.
    ///
    /// Dependents are invalidated only on change.
    pub fn set(&self, value: T) -> bool {
        {
            let mut current = self.target.data.borrow_mut();
            if *current == value {
                return false;
            }
            *current = value;
        }

        Runtime::notify(self.target.id, &Key::Cell);
        true
    }

    /// Update the value using a function of the current one.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> bool {
        let next = f(&self.target.data.borrow());
        self.set(next)
    }

    /// Number of computations that read this signal during their latest run.
    pub fn subscriber_count(&self) -> usize {
        Runtime::dependent_count(self.target.id, &Key::Cell)
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            target: Rc::clone(&self.target),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.target.id)
            .field("value", &*self.target.data.borrow())
            .finish()
    }
}
