//! Set handler: unique members in insertion order.

use indexmap::IndexSet;

use super::{Collection, Container, ContainerKind, raw_of};
use crate::graph::{EntryKey, Key};
use crate::value::Value;

/// Raw storage of a [`Set`].
pub type SetData = IndexSet<Value>;

/// A set of values. Containers are members by identity.
pub type Set = Container<SetData>;

impl ContainerKind for SetData {
    const NAME: &'static str = "Set";

    fn into_value(container: Container<Self>) -> Value {
        Value::Set(container)
    }

    fn from_value(value: &Value) -> Option<&Container<Self>> {
        match value {
            Value::Set(set) => Some(set),
            _ => None,
        }
    }
}

fn entry(value: &Value) -> Key {
    Key::Entry(EntryKey::from(value))
}

impl Set {
    /// Create an empty raw set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a raw set from values. Duplicates collapse.
    pub fn from_values<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Self::from_data(values.into_iter().map(|value| raw_of(&value.into())).collect())
    }

    /// Membership test. Depends on the member's entry only.
    pub fn contains(&self, value: &Value) -> bool {
        if let Some(facade) = &self.facade {
            facade.track_membership(|| entry(value));
        }
        self.target.data.borrow().contains(value)
    }

    /// Add a member, returning whether it was new.
    pub fn insert(&self, value: impl Into<Value>) -> bool {
        let value = raw_of(&value.into());
        let added = self.target.data.borrow_mut().insert(value.clone());

        if added {
            if let Some(facade) = &self.facade {
                let key = entry(&value);
                facade.trigger(&key);
                facade.trigger(&Key::KeySet);
                facade.written(&key, &value, None);
            }
        }
        added
    }

    /// Remove a member, returning whether it was present.
    pub fn remove(&self, value: &Value) -> bool {
        let Some(previous) = self.target.data.borrow_mut().shift_take(value) else {
            return false;
        };

        if let Some(facade) = &self.facade {
            let key = entry(&previous);
            facade.trigger(&key);
            facade.trigger(&Key::KeySet);
            facade.deleted(&key, &previous);
        }
        true
    }

    /// Remove every member, notifying each one individually.
    pub fn clear(&self) {
        let previous = std::mem::take(&mut *self.target.data.borrow_mut());
        if previous.is_empty() {
            return;
        }

        if let Some(facade) = &self.facade {
            facade.trigger(&Key::KeySet);
            for value in &previous {
                let key = entry(value);
                facade.trigger(&key);
                facade.deleted(&key, value);
            }
        }
    }

    /// Number of members. Depends on the key set.
    pub fn len(&self) -> usize {
        if let Some(facade) = &self.facade {
            facade.track_membership(|| Key::KeySet);
        }
        self.target.data.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Members in insertion order. Depends on the key set; nested containers
    /// come back wrapped.
    pub fn values(&self) -> Vec<Value> {
        let members: Vec<Value> = self.target.data.borrow().iter().cloned().collect();
        let Some(facade) = &self.facade else {
            return members;
        };

        facade.track_membership(|| Key::KeySet);
        members
            .into_iter()
            .map(|value| {
                let key = entry(&value);
                facade.wrap(value, || key)
            })
            .collect()
    }
}

impl Collection for Set {
    fn size(&self) -> usize {
        self.len()
    }

    fn contains_key(&self, key: &Value) -> bool {
        self.contains(key)
    }

    fn get_key(&self, key: &Value) -> Option<Value> {
        if !self.contains(key) {
            return None;
        }
        let member = self.target.data.borrow().get(key).cloned()?;
        match &self.facade {
            Some(facade) => Some(facade.wrap(member, || entry(key))),
            None => Some(member),
        }
    }

    fn remove_key(&self, key: &Value) -> bool {
        self.remove(key)
    }

    fn keys(&self) -> Vec<Value> {
        self.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::{Record, is_instrumented};
    use crate::reactive::Computed;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn contains_depends_on_one_member() {
        let set = Set::from_values([1, 2]).instrument();
        let reader = set.clone();
        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();
        let has_one = Computed::new(move || {
            runs_clone.set(runs_clone.get() + 1);
            reader.contains(&Value::from(1))
        });

        assert_eq!(has_one.get().unwrap(), Some(true));
        set.insert(3);
        set.remove(&Value::from(2));
        has_one.get().unwrap();
        assert_eq!(runs.get(), 1);

        set.remove(&Value::from(1));
        assert_eq!(has_one.get().unwrap(), Some(false));
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn idempotent_insert_and_remove_are_not_changes() {
        let set = Set::from_values(["a"]).instrument();
        let reader = set.clone();
        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();
        let size = Computed::new(move || {
            runs_clone.set(runs_clone.get() + 1);
            reader.len()
        });

        assert_eq!(size.get().unwrap(), Some(1));
        assert!(!set.insert("a"));
        assert!(!set.remove(&Value::from("b")));
        size.get().unwrap();
        assert_eq!(runs.get(), 1);

        assert!(set.insert("b"));
        assert_eq!(size.get().unwrap(), Some(2));
    }

    #[test]
    fn clear_notifies_every_member() {
        let set = Set::from_values([1, 2]).instrument();
        let reader = set.clone();
        let has_two = Computed::new(move || reader.contains(&Value::from(2)));

        assert_eq!(has_two.get().unwrap(), Some(true));
        set.clear();
        assert_eq!(has_two.get().unwrap(), Some(false));
        assert!(set.is_empty());
    }

    #[test]
    fn iterated_members_are_wrapped() {
        let member = Record::from_fields([("x", 1)]);
        let set = Set::from_values([Value::from(member.clone()), Value::from(7)]).instrument();

        let values = set.values();
        assert!(is_instrumented(&values[0]));
        assert!(values[0].as_record().unwrap().raw().ptr_eq(&member));
        assert_eq!(values[1], Value::from(7));
    }

    #[test]
    fn raw_and_facade_members_are_the_same_member() {
        let member = Record::new();
        let set = Set::new().instrument();
        assert!(set.insert(member.instrument()));
        assert!(!set.insert(member.clone()));
        assert!(set.contains(&Value::from(member)));
    }
}
