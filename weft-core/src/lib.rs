//! Weft Core
//!
//! This crate provides a fine-grained, push-pull dependency-tracking engine.
//! Computations declare what they depend on simply by reading it, and are
//! invalidated exactly when one of those reads would now see something
//! different.
//!
//! It implements:
//!
//! - Instrumented containers (records, lists, sets, maps) observed at
//!   per-key granularity, with nested containers wrapped lazily
//! - Memoized computations that rebuild their dependency set on every run
//! - A thread-local dependency graph keyed by (target, key)
//! - A batching scheduler for deferred change notifications
//! - Watches that turn a computation into an old/new change callback
//! - Models: named tracked and memoized fields
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: identities, edge keys, and the deferred task scheduler
//! - `reactive`: signals, computations, watches, and the runtime registry
//! - `instrument`: container handles and their facades
//! - `value`: the dynamic [`Value`] type and snapshots
//! - `model`: object-shaped surface over tracked and memoized fields
//!
//! # Example
//!
//! ```rust
//! use weft_core::{instrument, watch, Computed, Scheduler, Value, WatchOptions};
//! use serde_json::json;
//!
//! let state = instrument(Value::from(json!({ "a": { "b": 1, "c": 1 } })));
//!
//! let reader = state.clone();
//! let b = Computed::new(move || {
//!     let a = reader.as_record().and_then(|r| r.get("a")).unwrap_or_default();
//!     a.as_record().and_then(|a| a.get("b")).unwrap_or_default()
//! });
//! assert_eq!(b.get().unwrap(), Some(Value::from(1)));
//!
//! let a = state.as_record().and_then(|r| r.get("a")).unwrap_or_default();
//! let a = a.as_record().unwrap();
//!
//! // Unrelated sibling: `b` stays cached.
//! a.set("c", 2);
//! assert!(!b.is_dirty());
//!
//! a.set("b", 5);
//! assert_eq!(b.get().unwrap(), Some(Value::from(5)));
//!
//! let handle = watch(
//!     move || Ok(b.get()?.unwrap_or_default()),
//!     |new, old| println!("{old:?} -> {new:?}"),
//!     WatchOptions::default(),
//! )
//! .unwrap();
//! a.set("b", 6);
//! Scheduler::flush();
//! handle.dispose();
//! ```
//!
//! # Threading
//!
//! Every piece of shared state is thread-local. Containers and computations
//! are `!Send`; a host that needs several threads runs one graph per thread.

pub mod config;
pub mod error;
pub mod graph;
pub mod instrument;
pub mod model;
pub mod reactive;
pub mod value;

pub use config::{ComputedOptions, InstrumentOptions, WatchOptions};
pub use error::{Error, Result};
pub use graph::{Key, NodeId, NodeState, Scheduler, TargetId};
pub use instrument::{
    instrument, instrument_with, is_instrumented, raw_of, Collection, InstrumentHooks, List, Map, Record, Set,
};
pub use model::{MemoizedField, Model};
pub use reactive::{untracked, watch, Computed, ComputedHooks, Signal, WatchHandle};
pub use value::{Snapshot, Value};
