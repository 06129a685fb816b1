#![forbid(unsafe_code)]

//! Dynamic prop values and prop bags.
//!
//! # Design
//!
//! Values crossing the bridge are dynamically typed: the scope framework
//! reads and writes them by name through template expressions, while the
//! tree framework passes them as component props. [`PropValue`] covers the
//! data shapes both sides understand, plus three handle-like variants:
//!
//! - [`PropValue::Fn`] - a callback, compared by pointer identity.
//! - [`PropValue::Service`] - a resolved capability instance, passed as a
//!   fixed, non-reactive prop.
//! - [`PropValue::Slot`] - a [`TwoWaySlot`], the explicit two-way binding
//!   descriptor. Reading through the slot yields the current upstream value;
//!   writing routes the new value back to the owner instead of mutating
//!   anything in place.
//!
//! # Invariants
//!
//! 1. Data variants compare structurally; handle variants compare by
//!    pointer, so a cloned handle is equal to its original.
//! 2. A `Slot` entry in a bag is never silently replaced by a plain value
//!    on write - writes go through [`TwoWaySlot::write`] (the owning scope
//!    enforces this).

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;

/// A callback value. Invoked with positional arguments, returns a value
/// (commonly [`PropValue::Null`]).
#[derive(Clone)]
pub struct PropFn(Rc<dyn Fn(&[PropValue]) -> PropValue>);

impl PropFn {
    /// Wrap a closure as a callback value.
    #[must_use]
    pub fn new(f: impl Fn(&[PropValue]) -> PropValue + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Wrap a closure that returns nothing.
    #[must_use]
    pub fn from_unit(f: impl Fn(&[PropValue]) + 'static) -> Self {
        Self(Rc::new(move |args| {
            f(args);
            PropValue::Null
        }))
    }

    /// Invoke the callback.
    pub fn call(&self, args: &[PropValue]) -> PropValue {
        (self.0)(args)
    }
}

impl PartialEq for PropFn {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for PropFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PropFn").field(&"<fn>").finish()
    }
}

/// A named, opaque capability instance resolved from an injector.
///
/// Services are compared by pointer identity: two handles to the same
/// underlying instance are equal regardless of how they were obtained.
#[derive(Clone)]
pub struct Service {
    name: Rc<str>,
    object: Rc<dyn Any>,
}

impl Service {
    /// Wrap an instance under a service name.
    #[must_use]
    pub fn new(name: impl Into<String>, object: Rc<dyn Any>) -> Self {
        Self {
            name: Rc::from(name.into()),
            object,
        }
    }

    /// The name this service was registered under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Downcast to the concrete service type.
    #[must_use]
    pub fn downcast<T: 'static>(&self) -> Option<Rc<T>> {
        Rc::clone(&self.object).downcast::<T>().ok()
    }

    /// Pointer identity with another handle.
    #[must_use]
    pub fn same_instance(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.object, &other.object)
    }
}

impl PartialEq for Service {
    fn eq(&self, other: &Self) -> bool {
        self.same_instance(other)
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service").field("name", &self.name).finish()
    }
}

/// Explicit two-way binding descriptor.
///
/// Replaces live property accessor pairs with a plain value object:
/// `read` returns the current upstream value, `write` hands a new value
/// back to the owner (typically by invoking a change callback). Writing
/// does NOT update what `read` returns; the owner decides whether and when
/// to circulate the new value back in.
#[derive(Clone)]
pub struct TwoWaySlot {
    read: Rc<dyn Fn() -> PropValue>,
    write: Rc<dyn Fn(PropValue)>,
}

impl TwoWaySlot {
    /// Build a slot from a read closure and a write closure.
    #[must_use]
    pub fn new(read: impl Fn() -> PropValue + 'static, write: impl Fn(PropValue) + 'static) -> Self {
        Self {
            read: Rc::new(read),
            write: Rc::new(write),
        }
    }

    /// Current upstream value.
    #[must_use]
    pub fn read(&self) -> PropValue {
        (self.read)()
    }

    /// Hand a new value back to the owner.
    pub fn write(&self, value: PropValue) {
        (self.write)(value);
    }
}

impl PartialEq for TwoWaySlot {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.read, &other.read) && Rc::ptr_eq(&self.write, &other.write)
    }
}

impl fmt::Debug for TwoWaySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwoWaySlot").finish_non_exhaustive()
    }
}

/// A dynamically typed value passed across the framework boundary.
#[derive(Clone, Debug, PartialEq)]
pub enum PropValue {
    /// Absent / nothing.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<PropValue>),
    Map(PropBag),
    /// A callback (pointer identity).
    Fn(PropFn),
    /// A resolved capability instance (pointer identity).
    Service(Service),
    /// A two-way binding descriptor (pointer identity).
    Slot(TwoWaySlot),
}

impl PropValue {
    /// Convenience constructor for string values.
    #[must_use]
    pub fn str(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }

    /// Wrap a closure as a callback value.
    #[must_use]
    pub fn func(f: impl Fn(&[PropValue]) -> PropValue + 'static) -> Self {
        Self::Fn(PropFn::new(f))
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Render the value as interpolated text.
    ///
    /// Absent values interpolate to the empty string; handle variants have
    /// no textual form and also render empty.
    #[must_use]
    pub fn render_text(&self) -> String {
        match self {
            Self::Null | Self::Fn(_) | Self::Service(_) | Self::Slot(_) => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int(n) => n.to_string(),
            Self::Float(x) => x.to_string(),
            Self::Str(s) => s.clone(),
            Self::List(items) => items
                .iter()
                .map(PropValue::render_text)
                .collect::<Vec<_>>()
                .join(","),
            Self::Map(bag) => format!("{bag:?}"),
        }
    }
}

impl From<bool> for PropValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for PropValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for PropValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for PropValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

/// A string-keyed bag of [`PropValue`]s.
///
/// Lookup order is irrelevant to semantics, so the backing map is a hash
/// map; `Debug` output is key-sorted to stay deterministic.
#[derive(Clone, Default, PartialEq)]
pub struct PropBag {
    entries: AHashMap<String, PropValue>,
}

impl PropBag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.entries.get(name)
    }

    /// Like [`get`](Self::get) but cloning, with `Null` for absent keys.
    #[must_use]
    pub fn value(&self, name: &str) -> PropValue {
        self.entries.get(name).cloned().unwrap_or(PropValue::Null)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<PropValue>) {
        self.entries.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<PropValue> {
        self.entries.remove(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Insert every entry of `other`, overwriting existing keys.
    pub fn merge(&mut self, other: &PropBag) {
        for (k, v) in &other.entries {
            self.entries.insert(k.clone(), v.clone());
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keys in sorted order (deterministic iteration for diffing).
    #[must_use]
    pub fn sorted_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl fmt::Debug for PropBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for key in self.sorted_keys() {
            map.entry(&key, &self.entries[&key]);
        }
        map.finish()
    }
}

impl FromIterator<(String, PropValue)> for PropBag {
    fn from_iter<I: IntoIterator<Item = (String, PropValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
