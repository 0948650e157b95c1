//! Instrumentation Layer
//!
//! Containers (records, lists, sets, maps) are shared handles over a raw
//! target. A handle may carry a [`Facade`]: the instrumented view of the
//! target. Reads through a facade record dependency edges; writes through a
//! facade notify the computations that read the affected keys. Reads and
//! writes through a raw handle touch the data and nothing else.
//!
//! # Identity
//!
//! Each target owns a [`TargetId`]. The runtime associates a target with at
//! most one live facade, so instrumenting the same target twice hands back the
//! same facade, and instrumenting a facade returns it unchanged. The
//! association is weak: the facade lives exactly as long as some handle
//! carries it, and the target lives as long as some handle (raw or not)
//! points at it. Dropping a target forgets its facade and all edges on it.
//!
//! # Deep wrapping
//!
//! Nested containers are stored raw. When a read through a facade returns a
//! container, it is instrumented on the way out with the parent's options and
//! hooks (unless the facade is shallow or the `should_wrap` hook declines).

mod list;
mod map;
mod record;
mod set;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::config::InstrumentOptions;
use crate::graph::{Key, TargetId};
use crate::reactive::Runtime;
use crate::value::Value;

pub use list::{List, ListData};
pub use map::{Map, MapData};
pub use record::{Record, RecordData};
pub use set::{Set, SetData};

/// A raw target: the data plus a stable identity.
pub(crate) struct Target<T> {
    pub(crate) id: TargetId,
    pub(crate) data: RefCell<T>,
}

impl<T> Target<T> {
    pub(crate) fn new(data: T) -> Rc<Self> {
        Rc::new(Self {
            id: TargetId::new(),
            data: RefCell::new(data),
        })
    }
}

impl<T> Drop for Target<T> {
    fn drop(&mut self) {
        Runtime::forget_target(self.id);
    }
}

/// Container kinds that can live inside a [`Value`].
pub trait ContainerKind: Sized + 'static {
    /// Kind name used in debug output.
    const NAME: &'static str;

    fn into_value(container: Container<Self>) -> Value;

    fn from_value(value: &Value) -> Option<&Container<Self>>;
}

/// A shared handle to a raw target, optionally seen through its facade.
///
/// Cloning a handle yields another handle to the same target and facade.
pub struct Container<T> {
    pub(crate) target: Rc<Target<T>>,
    pub(crate) facade: Option<Rc<Facade>>,
}

impl<T> Container<T> {
    pub(crate) fn from_data(data: T) -> Self {
        Self {
            target: Target::new(data),
            facade: None,
        }
    }

    /// Identity of the underlying target.
    pub fn id(&self) -> TargetId {
        self.target.id
    }

    /// Whether reads and writes through this handle are observed.
    pub fn is_instrumented(&self) -> bool {
        self.facade.is_some()
    }

    /// A raw handle to the same target.
    pub fn raw(&self) -> Self {
        Self {
            target: Rc::clone(&self.target),
            facade: None,
        }
    }

    /// Instrument this container with default options and no hooks.
    pub fn instrument(&self) -> Self {
        self.instrument_with(&InstrumentOptions::default(), &InstrumentHooks::default())
    }

    /// Instrument this container.
    ///
    /// Returns `self` unchanged if it already is a facade, and the existing
    /// facade if the target was instrumented before (the first options and
    /// hooks win).
    pub fn instrument_with(&self, options: &InstrumentOptions, hooks: &InstrumentHooks) -> Self {
        if self.facade.is_some() {
            return self.clone();
        }

        let id = self.target.id;
        let facade = Runtime::facade(id).unwrap_or_else(|| {
            let facade = Rc::new(Facade {
                target: id,
                options: *options,
                hooks: hooks.clone(),
            });
            Runtime::associate(id, &facade);
            facade
        });

        Self {
            target: Rc::clone(&self.target),
            facade: Some(facade),
        }
    }

    /// Referential identity: same target seen through the same facade (or
    /// both raw).
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.target, &other.target)
            && match (&self.facade, &other.facade) {
                (None, None) => true,
                (Some(a), Some(b)) => Rc::ptr_eq(a, b),
                _ => false,
            }
    }
}

impl<T> Clone for Container<T> {
    fn clone(&self) -> Self {
        Self {
            target: Rc::clone(&self.target),
            facade: self.facade.clone(),
        }
    }
}

impl<T: Default> Default for Container<T> {
    fn default() -> Self {
        Self::from_data(T::default())
    }
}

impl<T: ContainerKind> fmt::Debug for Container<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(T::NAME)
            .field("target", &self.target.id)
            .field("instrumented", &self.is_instrumented())
            .finish()
    }
}

/// Uniform key-based access shared by every container kind.
///
/// Keys are field names for records, integer indices for lists, members for
/// sets, and entry keys for maps.
pub trait Collection {
    /// Number of keys. Depends on the key set as a whole.
    fn size(&self) -> usize;

    fn contains_key(&self, key: &Value) -> bool;

    fn get_key(&self, key: &Value) -> Option<Value>;

    /// Remove `key`, returning whether anything was removed.
    fn remove_key(&self, key: &Value) -> bool;

    /// Enumerate keys. Depends on the key set as a whole.
    fn keys(&self) -> Vec<Value>;
}

type ReadHook = Rc<dyn Fn(TargetId, &Key)>;
type WriteHook = Rc<dyn Fn(TargetId, &Key, &Value, Option<&Value>)>;
type DeleteHook = Rc<dyn Fn(TargetId, &Key, &Value)>;
type MembershipHook = Rc<dyn Fn(TargetId, &Key)>;
type WrapPredicate = Rc<dyn Fn(&Key, &Value) -> bool>;

/// Interception hooks fired by a facade in addition to dependency tracking.
#[derive(Clone, Default)]
pub struct InstrumentHooks {
    on_read: Option<ReadHook>,
    on_write: Option<WriteHook>,
    on_delete: Option<DeleteHook>,
    on_membership: Option<MembershipHook>,
    should_wrap: Option<WrapPredicate>,
}

impl InstrumentHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fired after a key is read.
    pub fn on_read(mut self, hook: impl Fn(TargetId, &Key) + 'static) -> Self {
        self.on_read = Some(Rc::new(hook));
        self
    }

    /// Fired after a write that changed something, with the new and previous
    /// values.
    pub fn on_write(mut self, hook: impl Fn(TargetId, &Key, &Value, Option<&Value>) + 'static) -> Self {
        self.on_write = Some(Rc::new(hook));
        self
    }

    /// Fired after a key is removed, with the removed value.
    pub fn on_delete(mut self, hook: impl Fn(TargetId, &Key, &Value) + 'static) -> Self {
        self.on_delete = Some(Rc::new(hook));
        self
    }

    /// Fired after a membership test, size query, or enumeration.
    pub fn on_membership(mut self, hook: impl Fn(TargetId, &Key) + 'static) -> Self {
        self.on_membership = Some(Rc::new(hook));
        self
    }

    /// Decide whether a nested container read under `key` gets wrapped.
    pub fn should_wrap(mut self, predicate: impl Fn(&Key, &Value) -> bool + 'static) -> Self {
        self.should_wrap = Some(Rc::new(predicate));
        self
    }
}

impl fmt::Debug for InstrumentHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentHooks")
            .field("on_read", &self.on_read.is_some())
            .field("on_write", &self.on_write.is_some())
            .field("on_delete", &self.on_delete.is_some())
            .field("on_membership", &self.on_membership.is_some())
            .field("should_wrap", &self.should_wrap.is_some())
            .finish()
    }
}

/// The instrumented view of one target.
#[derive(Debug)]
pub struct Facade {
    target: TargetId,
    options: InstrumentOptions,
    hooks: InstrumentHooks,
}

impl Facade {
    pub fn target(&self) -> TargetId {
        self.target
    }

    pub fn options(&self) -> InstrumentOptions {
        self.options
    }

    /// Record a read of `key` and fire the read hook.
    pub(crate) fn track(&self, key: impl Fn() -> Key) {
        Runtime::depend_on(self.target, &key);
        if let Some(hook) = &self.hooks.on_read {
            hook(self.target, &key());
        }
    }

    /// Record a dependency on the key set (or another membership key) and
    /// fire the membership hook.
    pub(crate) fn track_membership(&self, key: impl Fn() -> Key) {
        Runtime::depend_on(self.target, &key);
        if let Some(hook) = &self.hooks.on_membership {
            hook(self.target, &key());
        }
    }

    pub(crate) fn trigger(&self, key: &Key) {
        Runtime::notify(self.target, key);
    }

    pub(crate) fn written(&self, key: &Key, value: &Value, previous: Option<&Value>) {
        if let Some(hook) = &self.hooks.on_write {
            hook(self.target, key, value, previous);
        }
    }

    pub(crate) fn deleted(&self, key: &Key, previous: &Value) {
        if let Some(hook) = &self.hooks.on_delete {
            hook(self.target, key, previous);
        }
    }

    /// Instrument a nested container on its way out of a read.
    pub(crate) fn wrap(&self, value: Value, key: impl FnOnce() -> Key) -> Value {
        if !self.options.deep || !value.is_container() {
            return value;
        }
        if let Some(predicate) = &self.hooks.should_wrap {
            if !predicate(&key(), &value) {
                return value;
            }
        }
        instrument_with(value, &self.options, &self.hooks)
    }
}

/// Instrument a value with default options and no hooks.
///
/// Non-container values are returned unchanged.
pub fn instrument(value: Value) -> Value {
    instrument_with(value, &InstrumentOptions::default(), &InstrumentHooks::default())
}

/// Instrument a value with explicit options and hooks.
pub fn instrument_with(value: Value, options: &InstrumentOptions, hooks: &InstrumentHooks) -> Value {
    match value {
        Value::Record(record) => Value::Record(record.instrument_with(options, hooks)),
        Value::List(list) => Value::List(list.instrument_with(options, hooks)),
        Value::Set(set) => Value::Set(set.instrument_with(options, hooks)),
        Value::Map(map) => Value::Map(map.instrument_with(options, hooks)),
        other => other,
    }
}

/// The raw value behind a facade. Raw values are returned unchanged.
pub fn raw_of(value: &Value) -> Value {
    match value {
        Value::Record(record) => Value::Record(record.raw()),
        Value::List(list) => Value::List(list.raw()),
        Value::Set(set) => Value::Set(set.raw()),
        Value::Map(map) => Value::Map(map.raw()),
        other => other.clone(),
    }
}

/// Whether `value` is a container seen through a facade.
pub fn is_instrumented(value: &Value) -> bool {
    match value {
        Value::Record(record) => record.is_instrumented(),
        Value::List(list) => list.is_instrumented(),
        Value::Set(set) => set.is_instrumented(),
        Value::Map(map) => map.is_instrumented(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn instrumenting_is_idempotent() {
        let raw = Record::new();
        let first = raw.instrument();
        let second = raw.instrument();
        let again = first.instrument();

        assert!(first.ptr_eq(&second));
        assert!(first.ptr_eq(&again));
        assert!(!first.ptr_eq(&raw));
        assert!(first.raw().ptr_eq(&raw));
    }

    #[test]
    fn value_level_round_trip() {
        let raw = Value::from(List::new());
        let facade = instrument(raw.clone());

        assert!(is_instrumented(&facade));
        assert!(facade.ptr_eq(&instrument(facade.clone())));
        assert!(raw_of(&facade).ptr_eq(&raw));
        assert!(raw_of(&raw).ptr_eq(&raw));
    }

    #[test]
    fn non_containers_pass_through() {
        assert_eq!(instrument(Value::from(3)), Value::from(3));
        assert_eq!(instrument(Value::Null), Value::Null);
        assert!(!is_instrumented(&Value::from("x")));
    }

    #[test]
    fn first_options_win() {
        let raw = Map::new();
        let shallow = raw.instrument_with(&InstrumentOptions::shallow(), &InstrumentHooks::default());
        let deep = raw.instrument();

        assert!(shallow.ptr_eq(&deep));
        assert!(!deep.facade.as_ref().map_or(true, |f| f.options().deep));
    }

    #[test]
    fn dropped_facade_is_recreated() {
        let raw = Set::new();
        let first_id = raw.instrument().id();
        let facade = raw.instrument();

        assert_eq!(first_id, facade.id());
        assert!(facade.is_instrumented());
    }

    #[test]
    fn should_wrap_predicate_filters_nested_reads() {
        let raw = Record::new();
        raw.set("child", Record::new());
        raw.set("owner", Record::new());

        let facade = raw.instrument_with(
            &InstrumentOptions::default(),
            &InstrumentHooks::new().should_wrap(|key, _| key != &Key::field("owner")),
        );

        let child = facade.get("child").unwrap();
        let owner = facade.get("owner").unwrap();
        assert!(is_instrumented(&child));
        assert!(!is_instrumented(&owner));
    }

    #[test]
    fn hooks_fire() {
        let reads = Rc::new(Cell::new(0));
        let writes = Rc::new(Cell::new(0));
        let deletes = Rc::new(Cell::new(0));
        let memberships = Rc::new(Cell::new(0));

        let hooks = {
            let (r, w, d, m) = (reads.clone(), writes.clone(), deletes.clone(), memberships.clone());
            InstrumentHooks::new()
                .on_read(move |_, _| r.set(r.get() + 1))
                .on_write(move |_, _, _, _| w.set(w.get() + 1))
                .on_delete(move |_, _, _| d.set(d.get() + 1))
                .on_membership(move |_, _| m.set(m.get() + 1))
        };

        let record = Record::new().instrument_with(&InstrumentOptions::default(), &hooks);
        record.set("a", 1);
        record.set("a", 1);
        record.get("a");
        record.contains("a");
        record.remove("a");
        record.remove("a");

        assert_eq!(reads.get(), 1);
        assert_eq!(writes.get(), 1);
        assert_eq!(deletes.get(), 1);
        assert_eq!(memberships.get(), 1);
    }
}
