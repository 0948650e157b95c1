//! Dynamic Values
//!
//! [`Value`] is the currency of instrumented containers: primitives plus
//! shared container handles. Containers have identity; two handles are equal
//! when they point at the same target, whether either is seen through a
//! facade or not. Primitives compare by value, with floats using
//! same-value-zero semantics (NaN equals NaN, `-0.0` equals `0.0`) so
//! "did this write change anything" has a stable answer.
//!
//! # Snapshots
//!
//! [`Snapshot::snapshot`] produces a structural copy decoupled from live
//! container identity. For values read through facades, the copy is built by
//! reading through the facades, so a snapshot taken inside a computation
//! depends on every key it visited.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::graph::{EntryKey, TargetId};
use crate::instrument::{Container, ContainerKind, List, Map, Record, Set};

/// A dynamically typed value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Record(Record),
    List(List),
    Set(Set),
    Map(Map),
}

pub(crate) fn float_bits(value: f64) -> u64 {
    if value.is_nan() {
        f64::NAN.to_bits()
    } else if value == 0.0 {
        0
    } else {
        value.to_bits()
    }
}

impl Value {
    /// Name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Record(_) => "record",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_container(&self) -> bool {
        self.target_id().is_some()
    }

    /// Identity of the container behind this value.
    pub fn target_id(&self) -> Option<TargetId> {
        match self {
            Value::Record(record) => Some(record.id()),
            Value::List(list) => Some(list.id()),
            Value::Set(set) => Some(set.id()),
            Value::Map(map) => Some(map.id()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value as a float. Ints widen.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Non-negative int as a sequence index.
    pub fn as_index(&self) -> Option<usize> {
        self.as_int().and_then(|i| usize::try_from(i).ok())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&Set> {
        match self {
            Value::Set(set) => Some(set),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Referential identity: containers must be the same handle kind over the
    /// same target (both raw, or the same facade). Primitives compare by
    /// value.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Record(a), Value::Record(b)) => a.ptr_eq(b),
            (Value::List(a), Value::List(b)) => a.ptr_eq(b),
            (Value::Set(a), Value::Set(b)) => a.ptr_eq(b),
            (Value::Map(a), Value::Map(b)) => a.ptr_eq(b),
            (a, b) => !a.is_container() && !b.is_container() && a == b,
        }
    }

    fn snapshot_with(&self, seen: &mut HashMap<TargetId, Value>) -> Value {
        let Some(id) = self.target_id() else {
            return self.clone();
        };
        if let Some(copy) = seen.get(&id) {
            return copy.clone();
        }

        match self {
            Value::Record(record) => {
                let copy = Record::new();
                seen.insert(id, Value::Record(copy.clone()));
                for (name, value) in record.entries() {
                    copy.set(name, value.snapshot_with(seen));
                }
                Value::Record(copy)
            }
            Value::List(list) => {
                let copy = List::new();
                seen.insert(id, Value::List(copy.clone()));
                for value in list.values() {
                    copy.push(value.snapshot_with(seen));
                }
                Value::List(copy)
            }
            Value::Set(set) => {
                let copy = Set::new();
                seen.insert(id, Value::Set(copy.clone()));
                for value in set.values() {
                    copy.insert(value.snapshot_with(seen));
                }
                Value::Set(copy)
            }
            Value::Map(map) => {
                let copy = Map::new();
                seen.insert(id, Value::Map(copy.clone()));
                for (key, value) in map.entries() {
                    copy.insert(key.snapshot_with(seen), value.snapshot_with(seen));
                }
                Value::Map(copy)
            }
            other => other.clone(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => float_bits(*a) == float_bits(*b),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a.id() == b.id(),
            (Value::List(a), Value::List(b)) => a.id() == b.id(),
            (Value::Set(a), Value::Set(b)) => a.id() == b.id(),
            (Value::Map(a), Value::Map(b)) => a.id() == b.id(),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        EntryKey::from(self).hash(state);
    }
}

impl From<&Value> for EntryKey {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => EntryKey::Null,
            Value::Bool(b) => EntryKey::Bool(*b),
            Value::Int(i) => EntryKey::Int(*i),
            Value::Float(f) => EntryKey::Float(float_bits(*f)),
            Value::Str(s) => EntryKey::Str(s.clone()),
            Value::Record(record) => EntryKey::Target(record.id()),
            Value::List(list) => EntryKey::Target(list.id()),
            Value::Set(set) => EntryKey::Target(set.id()),
            Value::Map(map) => EntryKey::Target(map.id()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Record(record) => fmt::Debug::fmt(record, f),
            Value::List(list) => fmt::Debug::fmt(list, f),
            Value::Set(set) => fmt::Debug::fmt(set, f),
            Value::Map(map) => fmt::Debug::fmt(map, f),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl<T: ContainerKind> From<Container<T>> for Value {
    fn from(container: Container<T>) -> Self {
        T::into_value(container)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Build a raw tree: objects become records, arrays become lists.
impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::Str(s),
            Json::Array(items) => Value::List(List::from_values(items.into_iter().map(Value::from))),
            Json::Object(fields) => {
                Value::Record(Record::from_fields(fields.into_iter().map(|(k, v)| (k, Value::from(v)))))
            }
        }
    }
}

/// Deep structural copy, used by deep watches.
pub trait Snapshot: Clone {
    fn snapshot(&self) -> Self;
}

impl Snapshot for Value {
    fn snapshot(&self) -> Self {
        self.snapshot_with(&mut HashMap::new())
    }
}

impl<T: ContainerKind> Snapshot for Container<T> {
    fn snapshot(&self) -> Self {
        let copy = Value::from(self.clone()).snapshot();
        T::from_value(&copy).cloned().unwrap_or_else(|| self.raw())
    }
}

macro_rules! snapshot_by_clone {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Snapshot for $ty {
                fn snapshot(&self) -> Self {
                    self.clone()
                }
            }
        )*
    };
}

snapshot_by_clone!(bool, char, i8, i16, i32, i64, u8, u16, u32, u64, usize, isize, f32, f64, String, ());

impl<T: Snapshot> Snapshot for Option<T> {
    fn snapshot(&self) -> Self {
        self.as_ref().map(Snapshot::snapshot)
    }
}

impl<T: Snapshot> Snapshot for Vec<T> {
    fn snapshot(&self) -> Self {
        self.iter().map(Snapshot::snapshot).collect()
    }
}
