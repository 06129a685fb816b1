#![forbid(unsafe_code)]

//! Elements, components, and views.

use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use weft_core::{PropBag, SurfaceNode};

use crate::runtime::ViewCx;

/// A renderable component type.
pub trait ComponentType {
    /// Display name (shows up in logs, not in output).
    fn name(&self) -> &str;

    /// Memoized components skip re-rendering when their props are equal.
    fn memo(&self) -> bool {
        false
    }

    /// Produce this render's view. Must be pure: side effects belong in
    /// `use_effect`.
    fn render(&self, cx: &mut ViewCx<'_>) -> View;
}

/// Shared handle to a component type. Identity is pointer identity: the
/// runtime reuses an instance only when the component handle is the same.
pub type ComponentRef = Rc<dyn ComponentType>;

struct FnComponent {
    name: String,
    memo: bool,
    render: Box<dyn Fn(&mut ViewCx<'_>) -> View>,
}

impl ComponentType for FnComponent {
    fn name(&self) -> &str {
        &self.name
    }

    fn memo(&self) -> bool {
        self.memo
    }

    fn render(&self, cx: &mut ViewCx<'_>) -> View {
        (self.render)(cx)
    }
}

/// Create a function component.
#[must_use]
pub fn component(
    name: impl Into<String>,
    render: impl Fn(&mut ViewCx<'_>) -> View + 'static,
) -> ComponentRef {
    Rc::new(FnComponent {
        name: name.into(),
        memo: false,
        render: Box::new(render),
    })
}

/// Create a memoized function component: instances only re-render when
/// their props change.
#[must_use]
pub fn memo_component(
    name: impl Into<String>,
    render: impl Fn(&mut ViewCx<'_>) -> View + 'static,
) -> ComponentRef {
    Rc::new(FnComponent {
        name: name.into(),
        memo: true,
        render: Box::new(render),
    })
}

/// A component plus its props; cheap to clone and compare.
#[derive(Clone)]
pub struct Element {
    component: ComponentRef,
    props: PropBag,
    key: Option<u64>,
    memo: bool,
}

impl Element {
    #[must_use]
    pub fn new(component: ComponentRef, props: PropBag) -> Self {
        Self {
            component,
            props,
            key: None,
            memo: false,
        }
    }

    /// Reconciliation key (used inside keyed groups).
    #[must_use]
    pub fn with_key(mut self, key: u64) -> Self {
        self.key = Some(key);
        self
    }

    /// Mark this element memoized regardless of its component's default.
    #[must_use]
    pub fn memoized(mut self) -> Self {
        self.memo = true;
        self
    }

    /// Same component and key, different props.
    #[must_use]
    pub fn with_props(&self, props: PropBag) -> Self {
        Self {
            component: Rc::clone(&self.component),
            props,
            key: self.key,
            memo: self.memo,
        }
    }

    #[must_use]
    pub fn component(&self) -> ComponentRef {
        Rc::clone(&self.component)
    }

    #[must_use]
    pub fn props(&self) -> &PropBag {
        &self.props
    }

    #[must_use]
    pub fn key(&self) -> Option<u64> {
        self.key
    }

    #[must_use]
    pub fn is_memo(&self) -> bool {
        self.memo || self.component.memo()
    }

    /// Same underlying component type (pointer identity).
    #[must_use]
    pub fn same_component(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.component, &other.component)
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.same_component(other) && self.key == other.key && self.props == other.props
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("component", &self.component.name())
            .field("key", &self.key)
            .field("props", &self.props.len())
            .finish()
    }
}

/// A slot a committed surface node is published into, for imperative
/// access after commit (the one-time compile step uses this).
#[derive(Clone, Default)]
pub struct NodeRef {
    cell: Rc<RefCell<Option<SurfaceNode>>>,
}

impl NodeRef {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The committed node, once commit has run.
    #[must_use]
    pub fn get(&self) -> Option<SurfaceNode> {
        self.cell.borrow().clone()
    }

    #[must_use]
    pub fn same_ref(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }

    pub(crate) fn set(&self, node: SurfaceNode) {
        *self.cell.borrow_mut() = Some(node);
    }

    pub(crate) fn clear(&self) {
        *self.cell.borrow_mut() = None;
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("filled", &self.cell.borrow().is_some())
            .finish()
    }
}

/// A host surface declaration.
#[derive(Clone, Debug)]
pub struct SurfaceDecl {
    pub tag: String,
    pub attrs: BTreeMap<String, String>,
    pub node_ref: Option<NodeRef>,
}

impl SurfaceDecl {
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: BTreeMap::new(),
            node_ref: None,
        }
    }

    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn attrs(mut self, attrs: BTreeMap<String, String>) -> Self {
        self.attrs = attrs;
        self
    }

    #[must_use]
    pub fn with_ref(mut self, node_ref: NodeRef) -> Self {
        self.node_ref = Some(node_ref);
        self
    }
}

/// What a render returns.
pub enum View {
    /// Render nothing.
    Empty,
    /// A host surface node.
    Surface(SurfaceDecl),
    /// A single child component.
    Child(Element),
    /// Keyed children, reconciled by key.
    Group(Vec<(u64, View)>),
    /// Provide a context value to the subtree.
    Provide {
        value: Rc<dyn Any>,
        child: Box<View>,
    },
    /// Project the child into another surface instead of the parent.
    Portal {
        target: SurfaceNode,
        child: Box<View>,
    },
}

impl View {
    /// Provide a context value (looked up by type via
    /// [`ViewCx::context`](crate::runtime::ViewCx::context)).
    #[must_use]
    pub fn provide<T: 'static>(value: T, child: View) -> View {
        View::Provide {
            value: Rc::new(value),
            child: Box::new(child),
        }
    }

    /// Project `child` into `target`.
    #[must_use]
    pub fn portal(target: SurfaceNode, child: View) -> View {
        View::Portal {
            target,
            child: Box::new(child),
        }
    }
}

impl From<SurfaceDecl> for View {
    fn from(decl: SurfaceDecl) -> Self {
        View::Surface(decl)
    }
}

impl From<Element> for View {
    fn from(element: Element) -> Self {
        View::Child(element)
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Empty"),
            Self::Surface(decl) => f.debug_tuple("Surface").field(&decl.tag).finish(),
            Self::Child(el) => f.debug_tuple("Child").field(el).finish(),
            Self::Group(items) => f.debug_tuple("Group").field(&items.len()).finish(),
            Self::Provide { .. } => f.debug_tuple("Provide").finish(),
            Self::Portal { target, .. } => f.debug_tuple("Portal").field(&target.tag()).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_core::PropValue;

    #[test]
    fn element_equality_is_component_key_props() {
        let comp = component("c", |_| View::Empty);
        let mut props = PropBag::new();
        props.set("x", 1i64);

        let a = Element::new(Rc::clone(&comp), props.clone());
        let b = Element::new(Rc::clone(&comp), props.clone());
        assert_eq!(a, b);

        let other_comp = component("c", |_| View::Empty);
        let c = Element::new(other_comp, props.clone());
        assert_ne!(a, c);

        let mut props2 = props.clone();
        props2.set("x", PropValue::Int(2));
        assert_ne!(a, Element::new(comp, props2));
    }

    #[test]
    fn memo_flag_comes_from_component_or_element() {
        let plain = component("p", |_| View::Empty);
        let memo = memo_component("m", |_| View::Empty);

        assert!(!Element::new(Rc::clone(&plain), PropBag::new()).is_memo());
        assert!(Element::new(plain, PropBag::new()).memoized().is_memo());
        assert!(Element::new(memo, PropBag::new()).is_memo());
    }

    #[test]
    fn node_ref_starts_empty() {
        let r = NodeRef::new();
        assert!(r.get().is_none());
        assert!(r.same_ref(&r.clone()));
        assert!(!r.same_ref(&NodeRef::new()));
    }
}
