//! Map handler: associative entries in insertion order.
//!
//! `get` and `contains_key` depend on one entry. `len` and `keys` depend on
//! the key set. `values` and `entries` depend on the key set plus every entry
//! they read, so a value change on one key only reaches readers of that key.

use indexmap::IndexMap;

use super::{Collection, Container, ContainerKind, raw_of};
use crate::graph::{EntryKey, Key};
use crate::value::Value;

/// Raw storage of a [`Map`].
pub type MapData = IndexMap<Value, Value>;

/// An associative container keyed by arbitrary values.
pub type Map = Container<MapData>;

impl ContainerKind for MapData {
    const NAME: &'static str = "Map";

    fn into_value(container: Container<Self>) -> Value {
        Value::Map(container)
    }

    fn from_value(value: &Value) -> Option<&Container<Self>> {
        match value {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }
}

fn entry(key: &Value) -> Key {
    Key::Entry(EntryKey::from(key))
}

impl Map {
    /// Create an empty raw map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a raw map from `(key, value)` pairs.
    pub fn from_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<Value>,
        V: Into<Value>,
    {
        Self::from_data(
            entries
                .into_iter()
                .map(|(k, v)| (raw_of(&k.into()), v.into()))
                .collect(),
        )
    }

    /// Read the value stored under `key`.
    pub fn get(&self, key: &Value) -> Option<Value> {
        let value = self.target.data.borrow().get(key).cloned();
        let Some(facade) = &self.facade else {
            return value;
        };

        facade.track(|| entry(key));
        value.map(|value| facade.wrap(value, || entry(key)))
    }

    /// Whether `key` is present. Depends on that entry only.
    pub fn contains_key(&self, key: &Value) -> bool {
        if let Some(facade) = &self.facade {
            facade.track_membership(|| entry(key));
        }
        self.target.data.borrow().contains_key(key)
    }

    /// Store `value` under `key`, returning the previous value.
    ///
    /// Storing a value equal to the current one is not a change.
    pub fn insert(&self, key: impl Into<Value>, value: impl Into<Value>) -> Option<Value> {
        let key = raw_of(&key.into());
        let mut value = value.into();
        if self.facade.is_some() {
            value = raw_of(&value);
        }

        let previous = self.target.data.borrow_mut().insert(key.clone(), value.clone());
        let Some(facade) = &self.facade else {
            return previous;
        };

        let tracked = entry(&key);
        match &previous {
            None => {
                facade.trigger(&tracked);
                facade.trigger(&Key::KeySet);
                facade.written(&tracked, &value, None);
            }
            Some(old) if old != &value => {
                facade.trigger(&tracked);
                facade.written(&tracked, &value, Some(old));
            }
            Some(_) => {}
        }
        previous
    }

    /// Remove `key`, returning its value.
    pub fn remove(&self, key: &Value) -> Option<Value> {
        let previous = self.target.data.borrow_mut().shift_remove(key)?;

        if let Some(facade) = &self.facade {
            let tracked = entry(key);
            facade.trigger(&tracked);
            facade.trigger(&Key::KeySet);
            facade.deleted(&tracked, &previous);
        }
        Some(previous)
    }

    /// Remove every entry, notifying the key set and each previous key.
    pub fn clear(&self) {
        let previous = std::mem::take(&mut *self.target.data.borrow_mut());
        if previous.is_empty() {
            return;
        }

        if let Some(facade) = &self.facade {
            facade.trigger(&Key::KeySet);
            for (key, value) in &previous {
                let tracked = entry(key);
                facade.trigger(&tracked);
                facade.deleted(&tracked, value);
            }
        }
    }

    /// Number of entries. Depends on the key set.
    pub fn len(&self) -> usize {
        if let Some(facade) = &self.facade {
            facade.track_membership(|| Key::KeySet);
        }
        self.target.data.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys in insertion order. Depends on the key set.
    pub fn keys(&self) -> Vec<Value> {
        let keys: Vec<Value> = self.target.data.borrow().keys().cloned().collect();
        let Some(facade) = &self.facade else {
            return keys;
        };

        facade.track_membership(|| Key::KeySet);
        keys.into_iter()
            .map(|key| {
                let tracked = entry(&key);
                facade.wrap(key, || tracked)
            })
            .collect()
    }

    /// Values in insertion order.
    pub fn values(&self) -> Vec<Value> {
        self.entries().into_iter().map(|(_, value)| value).collect()
    }

    /// Entries in insertion order. Depends on the key set and every entry.
    pub fn entries(&self) -> Vec<(Value, Value)> {
        let raw_keys: Vec<Value> = self.target.data.borrow().keys().cloned().collect();
        let Some(facade) = &self.facade else {
            let data = self.target.data.borrow();
            return data.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        };

        facade.track_membership(|| Key::KeySet);
        raw_keys
            .into_iter()
            .filter_map(|key| {
                let value = self.get(&key)?;
                let tracked = entry(&key);
                Some((facade.wrap(key, || tracked), value))
            })
            .collect()
    }
}

impl Collection for Map {
    fn size(&self) -> usize {
        self.len()
    }

    fn contains_key(&self, key: &Value) -> bool {
        Map::contains_key(self, key)
    }

    fn get_key(&self, key: &Value) -> Option<Value> {
        self.get(key)
    }

    fn remove_key(&self, key: &Value) -> bool {
        self.remove(key).is_some()
    }

    fn keys(&self) -> Vec<Value> {
        Map::keys(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::{Record, is_instrumented};
    use crate::reactive::Computed;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counter() -> (Rc<Cell<usize>>, Rc<Cell<usize>>) {
        let runs = Rc::new(Cell::new(0));
        (runs.clone(), runs)
    }

    #[test]
    fn size_tracks_additions_and_removals() {
        let map = Map::new().instrument();
        let reader = map.clone();
        let size = Computed::new(move || reader.len());

        assert_eq!(size.get().unwrap(), Some(0));
        map.insert("a", 1);
        assert_eq!(size.get().unwrap(), Some(1));
        map.insert("b", 2);
        assert_eq!(size.get().unwrap(), Some(2));
        map.remove(&Value::from("a"));
        assert_eq!(size.get().unwrap(), Some(1));
    }

    #[test]
    fn get_depends_on_one_key() {
        let map = Map::from_entries([("a", 1), ("b", 2)]).instrument();
        let reader = map.clone();
        let (runs, runs_clone) = counter();
        let a = Computed::new(move || {
            runs_clone.set(runs_clone.get() + 1);
            reader.get(&Value::from("a"))
        });

        a.get().unwrap();
        map.insert("b", 20);
        map.insert("c", 30);
        a.get().unwrap();
        assert_eq!(runs.get(), 1);

        map.insert("a", 10);
        assert_eq!(a.get().unwrap(), Some(Some(Value::from(10))));
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn same_value_insert_is_silent() {
        let map = Map::from_entries([("a", 1)]).instrument();
        let reader = map.clone();
        let (runs, runs_clone) = counter();
        let a = Computed::new(move || {
            runs_clone.set(runs_clone.get() + 1);
            reader.get(&Value::from("a"))
        });

        a.get().unwrap();
        assert_eq!(map.insert("a", 1), Some(Value::from(1)));
        a.get().unwrap();
        assert!(!a.is_dirty());
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn clear_notifies_every_key() {
        let map = Map::from_entries([("a", 1), ("b", 2)]).instrument();
        let reader = map.clone();
        let b = Computed::new(move || reader.get(&Value::from("b")));

        assert_eq!(b.get().unwrap(), Some(Some(Value::from(2))));
        map.clear();
        assert!(b.is_dirty());
        assert_eq!(b.get().unwrap(), Some(None));
    }

    #[test]
    fn values_are_deep_wrapped() {
        let stored = Record::from_fields([("x", 1)]);
        let map = Map::from_entries([("k", stored.clone())]).instrument();

        let got = map.get(&Value::from("k")).unwrap();
        assert!(is_instrumented(&got));
        assert!(got.as_record().unwrap().raw().ptr_eq(&stored));

        let (_, value) = &map.entries()[0];
        assert!(is_instrumented(value));
    }

    #[test]
    fn nested_value_writes_reach_map_readers() {
        let map = Map::from_entries([("k", Record::from_fields([("x", 1)]))]).instrument();
        let reader = map.clone();
        let x = Computed::new(move || {
            reader
                .get(&Value::from("k"))
                .and_then(|record| record.as_record().and_then(|r| r.get("x")))
        });

        assert_eq!(x.get().unwrap(), Some(Some(Value::from(1))));
        let inner = map.get(&Value::from("k")).unwrap();
        inner.as_record().unwrap().set("x", 2);
        assert_eq!(x.get().unwrap(), Some(Some(Value::from(2))));
    }

    #[test]
    fn entries_depend_on_each_value() {
        let map = Map::from_entries([("a", 1), ("b", 2)]).instrument();
        let reader = map.clone();
        let sum = Computed::new(move || reader.values().iter().filter_map(Value::as_int).sum::<i64>());

        assert_eq!(sum.get().unwrap(), Some(3));
        map.insert("b", 5);
        assert_eq!(sum.get().unwrap(), Some(6));
    }

    #[test]
    fn container_keys_match_by_identity() {
        let key = Record::new();
        let map = Map::new().instrument();
        map.insert(key.instrument(), "v");

        assert_eq!(map.get(&Value::from(key.clone())), Some(Value::from("v")));
        assert!(!is_instrumented(&map.raw().keys()[0]));
        assert!(is_instrumented(&map.keys()[0]));
    }
}
