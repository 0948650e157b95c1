//! Models: named fields backed by tracked cells or computations.
//!
//! A [`Model`] is the object-shaped surface over the engine. Tracked fields
//! hold a [`Value`] in a single-value cell: reads record a dependency and
//! hand containers back instrumented, writes store raw values and invalidate
//! readers on change. Memoized fields are [`Computed`] nodes whose read and
//! write functions receive the model itself, so one field can derive from
//! others.
//!
//! ```rust
//! use weft_core::model::{MemoizedField, Model};
//!
//! let model = Model::builder()
//!     .tracked("first", "Ada")
//!     .tracked("last", "Lovelace")
//!     .memoized(
//!         "full",
//!         MemoizedField::new(|m| {
//!             let first = m.get("first")?;
//!             let last = m.get("last")?;
//!             Ok(format!("{} {}", first.as_str().unwrap_or(""), last.as_str().unwrap_or("")).into())
//!         }),
//!     )
//!     .build();
//!
//! assert_eq!(model.get("full").unwrap().as_str(), Some("Ada Lovelace"));
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::instrument::{instrument, raw_of};
use crate::reactive::{Computed, Signal};
use crate::value::Value;

type ReadField = Rc<dyn Fn(&Model) -> Result<Value>>;
type WriteField = Rc<dyn Fn(&Model, Value) -> Result<()>>;

/// Definition of a memoized field.
#[derive(Clone)]
pub struct MemoizedField {
    read: ReadField,
    write: Option<WriteField>,
    cache: bool,
}

impl MemoizedField {
    pub fn new<F>(read: F) -> Self
    where
        F: Fn(&Model) -> Result<Value> + 'static,
    {
        Self {
            read: Rc::new(read),
            write: None,
            cache: true,
        }
    }

    pub fn write<F>(mut self, write: F) -> Self
    where
        F: Fn(&Model, Value) -> Result<()> + 'static,
    {
        self.write = Some(Rc::new(write));
        self
    }

    pub fn cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }
}

impl fmt::Debug for MemoizedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoizedField")
            .field("writable", &self.write.is_some())
            .field("cache", &self.cache)
            .finish()
    }
}

#[derive(Clone)]
enum Field {
    Tracked(Signal<Value>),
    Memoized(Computed<Value>),
}

#[derive(Default)]
struct ModelInner {
    fields: RefCell<IndexMap<String, Field>>,
}

/// A set of named reactive fields.
///
/// Cloning yields another handle to the same model.
#[derive(Clone, Default)]
pub struct Model {
    inner: Rc<ModelInner>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> ModelBuilder {
        ModelBuilder::default()
    }

    fn upgrade(weak: &Weak<ModelInner>) -> Option<Model> {
        weak.upgrade().map(|inner| Model { inner })
    }

    /// Install a field backed by a tracked cell, replacing any field of the
    /// same name.
    pub fn define_tracked_field(&self, name: impl Into<String>, initial: impl Into<Value>) {
        let signal = Signal::new(raw_of(&initial.into()));
        self.install(name.into(), Field::Tracked(signal));
    }

    /// Install a field backed by a computation, replacing any field of the
    /// same name.
    ///
    /// The computation is lazy: its read function first runs on the first
    /// read of the field.
    pub fn define_memoized_field(&self, name: impl Into<String>, field: MemoizedField) {
        let name = name.into();
        let weak = Rc::downgrade(&self.inner);

        let read = field.read;
        let reader = weak.clone();
        let mut builder = Computed::builder(move || match Model::upgrade(&reader) {
            Some(model) => read(&model),
            None => Ok(Value::Null),
        })
        .cache(field.cache)
        .label(name.clone());

        if let Some(write) = field.write {
            builder = builder.write(move |value| match Model::upgrade(&weak) {
                Some(model) => write(&model, value),
                None => Ok(()),
            });
        }
        self.install(name, Field::Memoized(builder.build()));
    }

    fn install(&self, name: String, field: Field) {
        let replaced = self.inner.fields.borrow_mut().insert(name, field);
        if let Some(Field::Memoized(old)) = replaced {
            old.dispose();
        }
    }

    fn field(&self, name: &str) -> Result<Field> {
        self.inner
            .fields
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownField(name.to_owned()))
    }

    /// Read a field.
    ///
    /// Containers held by tracked fields come back instrumented. A disposed
    /// memoized field reads as [`Value::Null`].
    pub fn get(&self, name: &str) -> Result<Value> {
        match self.field(name)? {
            Field::Tracked(signal) => Ok(instrument(signal.get())),
            Field::Memoized(computed) => Ok(computed.get()?.unwrap_or_default()),
        }
    }

    /// Write a field. Memoized fields without a write function are
    /// read-only.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        match self.field(name)? {
            Field::Tracked(signal) => {
                signal.set(raw_of(&value.into()));
                Ok(())
            }
            Field::Memoized(computed) => computed.set(value.into()),
        }
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.inner.fields.borrow().contains_key(name)
    }

    /// Field names in definition order.
    pub fn field_names(&self) -> Vec<String> {
        self.inner.fields.borrow().keys().cloned().collect()
    }

    /// The computation behind a memoized field.
    pub fn computed(&self, name: &str) -> Option<Computed<Value>> {
        match self.inner.fields.borrow().get(name) {
            Some(Field::Memoized(computed)) => Some(computed.clone()),
            _ => None,
        }
    }

    /// Dispose every memoized field.
    pub fn dispose(&self) {
        let fields: Vec<Field> = self.inner.fields.borrow().values().cloned().collect();
        for field in fields {
            if let Field::Memoized(computed) = field {
                computed.dispose();
            }
        }
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("fields", &self.field_names())
            .finish()
    }
}

enum Definition {
    Tracked(Value),
    Memoized(MemoizedField),
}

/// Builder over [`Model::define_tracked_field`] and
/// [`Model::define_memoized_field`].
#[derive(Default)]
pub struct ModelBuilder {
    fields: Vec<(String, Definition)>,
}

impl ModelBuilder {
    pub fn tracked(mut self, name: impl Into<String>, initial: impl Into<Value>) -> Self {
        self.fields.push((name.into(), Definition::Tracked(initial.into())));
        self
    }

    pub fn memoized(mut self, name: impl Into<String>, field: MemoizedField) -> Self {
        self.fields.push((name.into(), Definition::Memoized(field)));
        self
    }

    pub fn build(self) -> Model {
        let model = Model::new();
        for (name, definition) in self.fields {
            match definition {
                Definition::Tracked(initial) => model.define_tracked_field(name, initial),
                Definition::Memoized(field) => model.define_memoized_field(name, field),
            }
        }
        model
    }
}
