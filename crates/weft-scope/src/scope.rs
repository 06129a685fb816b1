#![forbid(unsafe_code)]

//! Hierarchical scopes with watchers.
//!
//! # Design
//!
//! A [`Scope`] is a shared handle (`Rc<RefCell<..>>`) to a node in a scope
//! tree. Each scope owns a `props` bag - the values a bridged component has
//! pushed into it - and a list of watchers that the digest pass evaluates.
//!
//! Prop access is slot-aware: reading a prop whose entry is a
//! [`TwoWaySlot`](weft_core::TwoWaySlot) returns `slot.read()`, and writing
//! such a prop routes through `slot.write(..)` WITHOUT touching the stored
//! entry. This is how a two-way binding's scope-side writes surface as
//! change callbacks instead of local mutation.
//!
//! # Invariants
//!
//! 1. A destroyed scope stays destroyed; destruction is idempotent and
//!    recursive (children first have no observable ordering here - the
//!    whole subtree is gone after `destroy` returns).
//! 2. Watchers registered with [`Scope::watch`] die with their
//!    [`WatchGuard`]; watchers registered with [`Scope::watch_retained`]
//!    die with the scope.
//! 3. Dead watch entries are pruned lazily when the digest snapshots a
//!    scope's watcher list.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use weft_core::{PropBag, PropValue};

/// A watch expression: evaluated against the scope on every digest pass.
pub type WatchFn = Rc<dyn Fn(&Scope) -> PropValue>;

/// Listener invoked with (new, old) when a watched value changes.
pub type WatchListener = Rc<dyn Fn(&PropValue, &PropValue)>;

pub(crate) struct WatchEntry {
    pub(crate) watch: WatchFn,
    pub(crate) listener: WatchListener,
    /// `None` until the first digest pass evaluates the expression.
    pub(crate) last: RefCell<Option<PropValue>>,
    pub(crate) alive: Cell<bool>,
}

/// RAII guard for a watcher. Dropping it deregisters the watcher; the
/// entry is pruned from the scope on the next digest snapshot.
pub struct WatchGuard {
    entry: Rc<WatchEntry>,
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        self.entry.alive.set(false);
    }
}

impl fmt::Debug for WatchGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchGuard").finish_non_exhaustive()
    }
}

struct ScopeInner {
    parent: Option<Weak<RefCell<ScopeInner>>>,
    children: Vec<Scope>,
    props: PropBag,
    watchers: Vec<Rc<WatchEntry>>,
    destroyed: bool,
}

/// A shared handle to one node of the scope tree.
#[derive(Clone)]
pub struct Scope {
    inner: Rc<RefCell<ScopeInner>>,
}

impl Scope {
    /// Create a root scope (no parent).
    #[must_use]
    pub fn new_root() -> Self {
        Self {
            inner: Rc::new(RefCell::new(ScopeInner {
                parent: None,
                children: Vec::new(),
                props: PropBag::new(),
                watchers: Vec::new(),
                destroyed: false,
            })),
        }
    }

    /// Create a child scope under this one.
    #[must_use]
    pub fn new_child(&self) -> Scope {
        let child = Scope {
            inner: Rc::new(RefCell::new(ScopeInner {
                parent: Some(Rc::downgrade(&self.inner)),
                children: Vec::new(),
                props: PropBag::new(),
                watchers: Vec::new(),
                destroyed: false,
            })),
        };
        self.inner.borrow_mut().children.push(child.clone());
        tracing::debug!(
            target: "weft.scope",
            scope = child.scope_id(),
            parent = self.scope_id(),
            "scope created"
        );
        child
    }

    /// Pointer identity with another handle.
    #[must_use]
    pub fn same_scope(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Opaque id for logging.
    #[must_use]
    pub fn scope_id(&self) -> usize {
        Rc::as_ptr(&self.inner) as *const () as usize
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.inner.borrow().destroyed
    }

    /// Destroy this scope and its whole subtree. Idempotent.
    pub fn destroy(&self) {
        if self.inner.borrow().destroyed {
            return;
        }
        let (children, parent) = {
            let mut inner = self.inner.borrow_mut();
            inner.destroyed = true;
            inner.watchers.clear();
            inner.props = PropBag::new();
            (std::mem::take(&mut inner.children), inner.parent.take())
        };
        for child in children {
            child.destroy();
        }
        if let Some(parent) = parent.and_then(|w| w.upgrade()) {
            parent
                .borrow_mut()
                .children
                .retain(|c| !Rc::ptr_eq(&c.inner, &self.inner));
        }
        tracing::debug!(target: "weft.scope", scope = self.scope_id(), "scope destroyed");
    }

    // --- props -------------------------------------------------------------

    /// Replace the whole prop bag.
    pub fn set_props(&self, props: PropBag) {
        self.inner.borrow_mut().props = props;
    }

    /// Snapshot of the raw prop bag (slot entries included as-is).
    #[must_use]
    pub fn props(&self) -> PropBag {
        self.inner.borrow().props.clone()
    }

    /// Read a prop. Slot entries are dereferenced through their `read`.
    #[must_use]
    pub fn read_prop(&self, name: &str) -> PropValue {
        let value = self.inner.borrow().props.value(name);
        match value {
            PropValue::Slot(slot) => slot.read(),
            other => other,
        }
    }

    /// Write a prop. When the stored entry is a slot the value routes
    /// through `slot.write(..)` and the stored entry is left untouched;
    /// otherwise this is a plain insert.
    pub fn write_prop(&self, name: &str, value: PropValue) {
        let slot = match self.inner.borrow().props.get(name) {
            Some(PropValue::Slot(slot)) => Some(slot.clone()),
            _ => None,
        };
        match slot {
            Some(slot) => slot.write(value),
            None => self.inner.borrow_mut().props.set(name, value),
        }
    }

    // --- watchers ----------------------------------------------------------

    /// Register a watcher with an RAII deregistration guard.
    #[must_use]
    pub fn watch(
        &self,
        watch: impl Fn(&Scope) -> PropValue + 'static,
        listener: impl Fn(&PropValue, &PropValue) + 'static,
    ) -> WatchGuard {
        let entry = self.push_watcher(Rc::new(watch), Rc::new(listener));
        WatchGuard { entry }
    }

    /// Register a watcher that lives as long as the scope does.
    pub fn watch_retained(
        &self,
        watch: impl Fn(&Scope) -> PropValue + 'static,
        listener: impl Fn(&PropValue, &PropValue) + 'static,
    ) {
        let _ = self.push_watcher(Rc::new(watch), Rc::new(listener));
    }

    /// Watch several expressions as a group. The listener receives the full
    /// fresh value tuple whenever any member changes.
    #[must_use]
    pub fn watch_group(
        &self,
        watchers: Vec<WatchFn>,
        listener: impl Fn(&[PropValue]) + 'static,
    ) -> WatchGuard {
        self.watch(
            move |scope| PropValue::List(watchers.iter().map(|w| w(scope)).collect()),
            move |new, _old| {
                if let PropValue::List(values) = new {
                    listener(values);
                }
            },
        )
    }

    fn push_watcher(&self, watch: WatchFn, listener: WatchListener) -> Rc<WatchEntry> {
        let entry = Rc::new(WatchEntry {
            watch,
            listener,
            last: RefCell::new(None),
            alive: Cell::new(true),
        });
        self.inner.borrow_mut().watchers.push(Rc::clone(&entry));
        entry
    }

    /// Live watcher snapshot; prunes dead entries as a side effect.
    pub(crate) fn watchers_snapshot(&self) -> Vec<Rc<WatchEntry>> {
        let mut inner = self.inner.borrow_mut();
        inner.watchers.retain(|w| w.alive.get());
        inner.watchers.clone()
    }

    /// Collect this scope and all descendants (handle clones).
    pub(crate) fn collect_tree(&self, out: &mut Vec<Scope>) {
        out.push(self.clone());
        let children = self.inner.borrow().children.clone();
        for child in children {
            child.collect_tree(out);
        }
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        self.inner.borrow().children.len()
    }

    /// Direct children (handle clones), in creation order.
    #[must_use]
    pub fn children(&self) -> Vec<Scope> {
        self.inner.borrow().children.clone()
    }
}

impl PartialEq for Scope {
    fn eq(&self, other: &Self) -> bool {
        self.same_scope(other)
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Scope")
            .field("props", &inner.props.len())
            .field("watchers", &inner.watchers.len())
            .field("children", &inner.children.len())
            .field("destroyed", &inner.destroyed)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
