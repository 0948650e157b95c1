//! Record handler: string-keyed fields in insertion order.

use indexmap::IndexMap;

use super::{Collection, Container, ContainerKind, raw_of};
use crate::graph::Key;
use crate::value::Value;

/// Raw storage of a [`Record`].
pub type RecordData = IndexMap<String, Value>;

/// A struct-like container of named fields.
pub type Record = Container<RecordData>;

impl ContainerKind for RecordData {
    const NAME: &'static str = "Record";

    fn into_value(container: Container<Self>) -> Value {
        Value::Record(container)
    }

    fn from_value(value: &Value) -> Option<&Container<Self>> {
        match value {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }
}

impl Record {
    /// Create an empty raw record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a raw record from `(name, value)` pairs.
    pub fn from_fields<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self::from_data(fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Read a field.
    pub fn get(&self, name: &str) -> Option<Value> {
        let value = self.target.data.borrow().get(name).cloned();
        let Some(facade) = &self.facade else {
            return value;
        };

        facade.track(|| Key::field(name));
        value.map(|value| facade.wrap(value, || Key::field(name)))
    }

    /// Write a field, returning whether anything changed.
    ///
    /// A new field changes the key set; an existing field changes only if the
    /// value differs.
    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) -> bool {
        let name = name.into();
        let mut value = value.into();
        if self.facade.is_some() {
            value = raw_of(&value);
        }

        let previous = self.target.data.borrow_mut().insert(name.clone(), value.clone());
        let added = previous.is_none();
        let changed = previous.as_ref().is_some_and(|previous| previous != &value);

        if let Some(facade) = &self.facade {
            let key = Key::Field(name);
            if added || changed {
                facade.trigger(&key);
            }
            if added {
                facade.trigger(&Key::KeySet);
            }
            if added || changed {
                facade.written(&key, &value, previous.as_ref());
            }
        }
        added || changed
    }

    /// Remove a field, returning its value. Removing an absent field is a
    /// no-op.
    pub fn remove(&self, name: &str) -> Option<Value> {
        let previous = self.target.data.borrow_mut().shift_remove(name)?;

        if let Some(facade) = &self.facade {
            let key = Key::field(name);
            facade.trigger(&key);
            facade.trigger(&Key::KeySet);
            facade.deleted(&key, &previous);
        }
        Some(previous)
    }

    /// Membership test. Depends on the key set.
    pub fn contains(&self, name: &str) -> bool {
        if let Some(facade) = &self.facade {
            facade.track_membership(|| Key::KeySet);
        }
        self.target.data.borrow().contains_key(name)
    }

    /// Field names in insertion order. Depends on the key set.
    pub fn keys(&self) -> Vec<String> {
        if let Some(facade) = &self.facade {
            facade.track_membership(|| Key::KeySet);
        }
        self.target.data.borrow().keys().cloned().collect()
    }

    /// Number of fields. Depends on the key set.
    pub fn len(&self) -> usize {
        if let Some(facade) = &self.facade {
            facade.track_membership(|| Key::KeySet);
        }
        self.target.data.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All fields in insertion order. Depends on the key set and on every
    /// field read.
    pub fn entries(&self) -> Vec<(String, Value)> {
        let names = self.keys();
        names
            .into_iter()
            .filter_map(|name| self.get(&name).map(|value| (name, value)))
            .collect()
    }
}

impl Collection for Record {
    fn size(&self) -> usize {
        self.len()
    }

    fn contains_key(&self, key: &Value) -> bool {
        key.as_str().is_some_and(|name| self.contains(name))
    }

    fn get_key(&self, key: &Value) -> Option<Value> {
        key.as_str().and_then(|name| self.get(name))
    }

    fn remove_key(&self, key: &Value) -> bool {
        key.as_str().is_some_and(|name| self.remove(name).is_some())
    }

    fn keys(&self) -> Vec<Value> {
        Record::keys(self).into_iter().map(Value::from).collect()
    }
}
