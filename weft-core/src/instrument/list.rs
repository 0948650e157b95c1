//! List handler: an ordered sequence addressed by index.
//!
//! Index writes inside the sequence always count as a change, equal value or
//! not. Operations that change the length notify `Length`, the key set, and
//! every index whose element moved.

use super::{Collection, Container, ContainerKind, raw_of};
use crate::error::{Error, Result};
use crate::graph::Key;
use crate::value::Value;

/// Raw storage of a [`List`].
pub type ListData = Vec<Value>;

/// An ordered sequence of values.
pub type List = Container<ListData>;

impl ContainerKind for ListData {
    const NAME: &'static str = "List";

    fn into_value(container: Container<Self>) -> Value {
        Value::List(container)
    }

    fn from_value(value: &Value) -> Option<&Container<Self>> {
        match value {
            Value::List(list) => Some(list),
            _ => None,
        }
    }
}

impl List {
    /// Create an empty raw list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a raw list from values.
    pub fn from_values<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Self::from_data(values.into_iter().map(Into::into).collect())
    }

    /// Read an element.
    pub fn get(&self, index: usize) -> Option<Value> {
        let value = self.target.data.borrow().get(index).cloned();
        let Some(facade) = &self.facade else {
            return value;
        };

        facade.track(|| Key::Index(index));
        value.map(|value| facade.wrap(value, || Key::Index(index)))
    }

    /// Number of elements. Depends on the length.
    pub fn len(&self) -> usize {
        if let Some(facade) = &self.facade {
            facade.track(|| Key::Length);
        }
        self.target.data.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Overwrite the element at `index`, or append when `index == len`.
    pub fn set(&self, index: usize, value: impl Into<Value>) -> Result<()> {
        let value = self.store(value.into());
        let len = self.target.data.borrow().len();

        if index == len {
            self.push(value);
            return Ok(());
        }
        if index > len {
            return Err(Error::IndexOutOfBounds { index, len });
        }

        let previous = std::mem::replace(&mut self.target.data.borrow_mut()[index], value.clone());
        if let Some(facade) = &self.facade {
            let key = Key::Index(index);
            facade.trigger(&key);
            facade.written(&key, &value, Some(&previous));
        }
        Ok(())
    }

    /// Append an element.
    pub fn push(&self, value: impl Into<Value>) {
        let value = self.store(value.into());
        let index = {
            let mut data = self.target.data.borrow_mut();
            data.push(value.clone());
            data.len() - 1
        };

        if let Some(facade) = &self.facade {
            let key = Key::Index(index);
            facade.trigger(&key);
            self.resized();
            facade.written(&key, &value, None);
        }
    }

    /// Remove and return the last element.
    pub fn pop(&self) -> Option<Value> {
        let (previous, index) = {
            let mut data = self.target.data.borrow_mut();
            let previous = data.pop()?;
            (previous, data.len())
        };

        if let Some(facade) = &self.facade {
            let key = Key::Index(index);
            facade.trigger(&key);
            self.resized();
            facade.deleted(&key, &previous);
        }
        Some(previous)
    }

    /// Insert an element at `index`, shifting later elements right.
    pub fn insert(&self, index: usize, value: impl Into<Value>) -> Result<()> {
        let value = self.store(value.into());
        let new_len = {
            let mut data = self.target.data.borrow_mut();
            let len = data.len();
            if index > len {
                return Err(Error::IndexOutOfBounds { index, len });
            }
            data.insert(index, value.clone());
            data.len()
        };

        if let Some(facade) = &self.facade {
            self.shifted(index, new_len);
            self.resized();
            facade.written(&Key::Index(index), &value, None);
        }
        Ok(())
    }

    /// Remove the element at `index`, shifting later elements left.
    pub fn remove(&self, index: usize) -> Result<Value> {
        let (previous, old_len) = {
            let mut data = self.target.data.borrow_mut();
            let len = data.len();
            if index >= len {
                return Err(Error::IndexOutOfBounds { index, len });
            }
            (data.remove(index), len)
        };

        if let Some(facade) = &self.facade {
            self.shifted(index, old_len);
            self.resized();
            facade.deleted(&Key::Index(index), &previous);
        }
        Ok(previous)
    }

    /// Remove every element.
    pub fn clear(&self) {
        let previous = std::mem::take(&mut *self.target.data.borrow_mut());
        if previous.is_empty() {
            return;
        }

        if let Some(facade) = &self.facade {
            self.shifted(0, previous.len());
            self.resized();
            for (index, value) in previous.iter().enumerate() {
                facade.deleted(&Key::Index(index), value);
            }
        }
    }

    /// All elements in order. Depends on the length and every index.
    pub fn values(&self) -> Vec<Value> {
        let len = self.len();
        (0..len).filter_map(|index| self.get(index)).collect()
    }

    /// Whether any element equals `needle`. Depends on the length and every
    /// index.
    pub fn contains(&self, needle: &Value) -> bool {
        let needle = raw_of(needle);
        if let Some(facade) = &self.facade {
            facade.track(|| Key::Length);
            let len = self.target.data.borrow().len();
            for index in 0..len {
                facade.track(|| Key::Index(index));
            }
        }
        self.target.data.borrow().iter().any(|value| value == &needle)
    }

    fn store(&self, value: Value) -> Value {
        if self.facade.is_some() {
            raw_of(&value)
        } else {
            value
        }
    }

    fn shifted(&self, from: usize, to: usize) {
        if let Some(facade) = &self.facade {
            for index in from..to {
                facade.trigger(&Key::Index(index));
            }
        }
    }

    fn resized(&self) {
        if let Some(facade) = &self.facade {
            facade.trigger(&Key::Length);
            facade.trigger(&Key::KeySet);
        }
    }
}

impl Collection for List {
    fn size(&self) -> usize {
        self.len()
    }

    fn contains_key(&self, key: &Value) -> bool {
        if let Some(facade) = &self.facade {
            facade.track_membership(|| Key::KeySet);
        }
        key.as_index()
            .is_some_and(|index| index < self.target.data.borrow().len())
    }

    fn get_key(&self, key: &Value) -> Option<Value> {
        key.as_index().and_then(|index| self.get(index))
    }

    fn remove_key(&self, key: &Value) -> bool {
        key.as_index().is_some_and(|index| self.remove(index).is_ok())
    }

    fn keys(&self) -> Vec<Value> {
        if let Some(facade) = &self.facade {
            facade.track_membership(|| Key::KeySet);
        }
        let len = self.target.data.borrow().len();
        (0..len).map(|index| Value::Int(index as i64)).collect()
    }
}
