//! Reactive Primitives
//!
//! This module implements the computation side of the engine: cells,
//! memoized computations, and watches, plus the runtime that connects them to
//! instrumented data.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a single-value cell. Reading it inside a computation records
//! a dependency; writing a different value invalidates every computation that
//! read it.
//!
//! ## Computeds
//!
//! A Computed is a derived value that caches its result. It discovers its
//! dependencies on every run and re-runs only after one of them is written.
//! Its change notification is deferred to the [`Scheduler`](crate::Scheduler)
//! so a burst of writes produces one notification.
//!
//! ## Watches
//!
//! A watch wraps a Computed and calls a handler with the new and previous
//! value after each batch of changes.
//!
//! # Implementation Notes
//!
//! Tracking is ambient: a thread-local stack records which computation is
//! running, and every tracked read consults it. Edges live in the
//! thread-local [`Runtime`] registry and are rebuilt from scratch on every
//! run, so a computation never keeps an edge to something it stopped reading.

mod computed;
mod context;
mod runtime;
mod signal;
mod subscriber;
mod watch;

pub use computed::{Computed, ComputedBuilder, ComputedHooks};
pub use context::{untracked, ReactiveContext};
pub use runtime::Runtime;
pub use signal::Signal;
pub use subscriber::Subscriber;
pub use watch::{watch, WatchHandle};
