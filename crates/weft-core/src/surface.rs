#![forbid(unsafe_code)]

//! DOM-like render surfaces.
//!
//! A [`SurfaceNode`] is the neutral meeting point of the two frameworks: the
//! tree framework commits elements into surfaces, and the scope framework
//! compiles a surface's raw attributes against a scope, materializing
//! resolved values on every digest. Surfaces are shared handles; cloning a
//! node clones the handle, not the node. Identity is pointer identity.
//!
//! Attributes come in three layers:
//!
//! - **raw** - the attribute string as written (template expressions or
//!   plain text). Set at commit time.
//! - **resolved** - digest-materialized values for expression attributes.
//! - **handlers** - invocable entries installed for callback-shaped
//!   attributes; invoking one evaluates the callback expression with a bag
//!   of named locals.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::value::{PropBag, PropValue};

/// An invocable attribute handler: named locals in, value out.
pub type Handler = Rc<dyn Fn(&PropBag) -> PropValue>;

struct SurfaceInner {
    tag: String,
    raw_attrs: BTreeMap<String, String>,
    resolved: BTreeMap<String, PropValue>,
    handlers: BTreeMap<String, Handler>,
    children: Vec<SurfaceNode>,
}

/// A shared handle to a DOM-like node.
#[derive(Clone)]
pub struct SurfaceNode {
    inner: Rc<RefCell<SurfaceInner>>,
}

impl SurfaceNode {
    /// Create a detached node with the given element name.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SurfaceInner {
                tag: tag.into(),
                raw_attrs: BTreeMap::new(),
                resolved: BTreeMap::new(),
                handlers: BTreeMap::new(),
                children: Vec::new(),
            })),
        }
    }

    #[must_use]
    pub fn tag(&self) -> String {
        self.inner.borrow().tag.clone()
    }

    /// Pointer identity with another handle.
    #[must_use]
    pub fn same_node(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// A stable opaque id for logging and identity caches.
    #[must_use]
    pub fn node_id(&self) -> usize {
        Rc::as_ptr(&self.inner) as *const () as usize
    }

    // --- raw attributes ----------------------------------------------------

    pub fn set_raw_attr(&self, name: impl Into<String>, value: impl Into<String>) {
        self.inner
            .borrow_mut()
            .raw_attrs
            .insert(name.into(), value.into());
    }

    #[must_use]
    pub fn raw_attr(&self, name: &str) -> Option<String> {
        self.inner.borrow().raw_attrs.get(name).cloned()
    }

    #[must_use]
    pub fn raw_attrs(&self) -> BTreeMap<String, String> {
        self.inner.borrow().raw_attrs.clone()
    }

    /// Replace the raw attribute map wholesale (commit-time sync).
    pub fn sync_raw_attrs(&self, attrs: &BTreeMap<String, String>) {
        self.inner.borrow_mut().raw_attrs = attrs.clone();
    }

    // --- resolved values ---------------------------------------------------

    pub fn set_resolved(&self, name: impl Into<String>, value: PropValue) {
        self.inner.borrow_mut().resolved.insert(name.into(), value);
    }

    #[must_use]
    pub fn resolved(&self, name: &str) -> Option<PropValue> {
        self.inner.borrow().resolved.get(name).cloned()
    }

    // --- handlers ----------------------------------------------------------

    pub fn set_handler(&self, name: impl Into<String>, handler: Handler) {
        self.inner.borrow_mut().handlers.insert(name.into(), handler);
    }

    /// Invoke a callback attribute with named locals.
    ///
    /// Returns `None` when no handler is installed under that name.
    #[must_use]
    pub fn invoke(&self, name: &str, locals: &PropBag) -> Option<PropValue> {
        let handler = self.inner.borrow().handlers.get(name).cloned();
        handler.map(|h| h(locals))
    }

    #[must_use]
    pub fn has_handler(&self, name: &str) -> bool {
        self.inner.borrow().handlers.contains_key(name)
    }

    // --- children ----------------------------------------------------------

    pub fn append_child(&self, child: &SurfaceNode) {
        self.inner.borrow_mut().children.push(child.clone());
    }

    /// Detach a child (matched by pointer identity). No-op if absent.
    pub fn remove_child(&self, child: &SurfaceNode) {
        self.inner
            .borrow_mut()
            .children
            .retain(|c| !c.same_node(child));
    }

    #[must_use]
    pub fn children(&self) -> Vec<SurfaceNode> {
        self.inner.borrow().children.clone()
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        self.inner.borrow().children.len()
    }
}

impl PartialEq for SurfaceNode {
    fn eq(&self, other: &Self) -> bool {
        self.same_node(other)
    }
}

impl fmt::Debug for SurfaceNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("SurfaceNode")
            .field("tag", &inner.tag)
            .field("attrs", &inner.raw_attrs.len())
            .field("children", &inner.children.len())
            .finish()
    }
}
