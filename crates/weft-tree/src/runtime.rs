#![forbid(unsafe_code)]

//! The headless mount/commit/effect runtime.
//!
//! # Design
//!
//! Instances are shared records keyed by id. A flush cycle processes the
//! dirty-instance queue first (render + commit, depth-first into children),
//! then the effect queue. Renders are pure; every side-effecting closure
//! registered through [`ViewCx::use_effect`] runs strictly after its
//! instance's output has been committed, so committed surfaces (and node
//! refs) exist before any effect observes them.
//!
//! Reconciliation is identity-based:
//!
//! - a child element re-uses its instance when the component handle and key
//!   match; otherwise the old instance unmounts and a fresh one mounts;
//! - keyed groups match entries by key;
//! - portals re-use their subtree only while the target surface is the
//!   same node.
//!
//! Unmounting runs child teardown first, then the instance's own effect
//! cleanups in reverse registration order.
//!
//! # Failure Modes
//!
//! - **Hook order change**: calling hooks conditionally changes the slot
//!   sequence between renders and panics. This is a bug in the component,
//!   not a recoverable condition.
//! - **Set-state on an unmounted instance**: silently ignored; the setter
//!   holds only weak references.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use weft_core::{PropBag, PropValue, SurfaceNode};

use crate::element::{Element, NodeRef, View};

/// Effect dependency policy.
#[derive(Clone, Debug, PartialEq)]
pub enum Deps {
    /// Run after every render.
    Always,
    /// Run once after the first commit; cleanup at unmount.
    Once,
    /// Re-run when the key values change.
    Keyed(Vec<PropValue>),
}

/// Optional teardown returned by an effect.
pub type Cleanup = Option<Box<dyn FnOnce()>>;

/// Wrap a closure as an effect cleanup.
#[must_use]
pub fn cleanup(f: impl FnOnce() + 'static) -> Cleanup {
    Some(Box::new(f))
}

type EffectFn = Box<dyn FnOnce() -> Cleanup>;

struct EffectHook {
    deps: Deps,
    cleanup: Option<Box<dyn FnOnce()>>,
    pending: Option<EffectFn>,
}

enum Hook {
    State(Rc<dyn Any>),
    Ref(Rc<dyn Any>),
    Effect(EffectHook),
}

// --- context ---------------------------------------------------------------

struct ContextNode {
    value: Rc<dyn Any>,
    parent: Option<Rc<ContextNode>>,
}

/// Immutable stack of context values; lookup is by concrete type, nearest
/// provider wins.
#[derive(Clone, Default)]
struct ContextStack(Option<Rc<ContextNode>>);

impl ContextStack {
    fn push(&self, value: Rc<dyn Any>) -> ContextStack {
        ContextStack(Some(Rc::new(ContextNode {
            value,
            parent: self.0.clone(),
        })))
    }

    fn lookup<T: Clone + 'static>(&self) -> Option<T> {
        let mut cur = self.0.clone();
        while let Some(node) = cur {
            if let Ok(found) = Rc::downcast::<T>(Rc::clone(&node.value)) {
                return Some((*found).clone());
            }
            cur = node.parent.clone();
        }
        None
    }
}

// --- committed output ------------------------------------------------------

enum Committed {
    Empty,
    Surface {
        node: SurfaceNode,
        parent: SurfaceNode,
        node_ref: Option<NodeRef>,
    },
    Child(u64),
    Group(Vec<(u64, Committed)>),
    Provide(Box<Committed>),
    Portal {
        target: SurfaceNode,
        inner: Box<Committed>,
    },
}

struct Instance {
    element: Element,
    context: ContextStack,
    parent_surface: SurfaceNode,
    hooks: Vec<Hook>,
    committed: Option<Committed>,
    dirty: bool,
    alive: bool,
}

struct RuntimeShared {
    instances: RefCell<AHashMap<u64, Rc<RefCell<Instance>>>>,
    render_queue: RefCell<VecDeque<u64>>,
    effect_queue: RefCell<VecDeque<(u64, usize)>>,
    next_instance: Cell<u64>,
    flushing: Cell<bool>,
}

impl RuntimeShared {
    fn mark_dirty(&self, id: u64) {
        let newly_dirty = self
            .instances
            .borrow()
            .get(&id)
            .is_some_and(|rc| {
                let mut inst = rc.borrow_mut();
                if inst.alive && !inst.dirty {
                    inst.dirty = true;
                    true
                } else {
                    false
                }
            });
        if newly_dirty {
            self.render_queue.borrow_mut().push_back(id);
        }
    }
}

/// Setter half of [`ViewCx::use_state`]. Clonable; silently inert once the
/// owning instance unmounts.
pub struct StateSetter<T> {
    cell: Rc<RefCell<T>>,
    shared: Weak<RuntimeShared>,
    instance: u64,
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
            shared: Weak::clone(&self.shared),
            instance: self.instance,
        }
    }
}

impl<T: Clone + PartialEq + 'static> StateSetter<T> {
    /// Replace the state value; schedules a re-render unless equal.
    pub fn set(&self, value: T) {
        {
            if *self.cell.borrow() == value {
                return;
            }
        }
        *self.cell.borrow_mut() = value;
        self.invalidate();
    }

    /// Mutate the state value in place; schedules a re-render if changed.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let before = self.cell.borrow().clone();
        f(&mut self.cell.borrow_mut());
        let changed = *self.cell.borrow() != before;
        if changed {
            self.invalidate();
        }
    }

    fn invalidate(&self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.mark_dirty(self.instance);
        }
    }
}

impl<T> fmt::Debug for StateSetter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateSetter")
            .field("instance", &self.instance)
            .finish()
    }
}

/// Hook context passed to component renders.
pub struct ViewCx<'a> {
    hooks: &'a mut Vec<Hook>,
    cursor: usize,
    props: &'a PropBag,
    context: &'a ContextStack,
    shared: &'a Rc<RuntimeShared>,
    instance: u64,
    scheduled_effects: Vec<usize>,
}

impl ViewCx<'_> {
    /// The props this instance was rendered with.
    #[must_use]
    pub fn props(&self) -> &PropBag {
        self.props
    }

    /// State hook: returns the current value and a setter.
    pub fn use_state<T: Clone + PartialEq + 'static>(
        &mut self,
        init: impl FnOnce() -> T,
    ) -> (T, StateSetter<T>) {
        let slot = self.next_slot();
        if self.hooks.len() == slot {
            let cell: Rc<RefCell<T>> = Rc::new(RefCell::new(init()));
            self.hooks.push(Hook::State(cell));
        }
        let Hook::State(any) = &self.hooks[slot] else {
            panic!("hook order changed between renders");
        };
        let cell = Rc::clone(any)
            .downcast::<RefCell<T>>()
            .unwrap_or_else(|_| panic!("hook type changed between renders"));
        let value = cell.borrow().clone();
        let setter = StateSetter {
            cell,
            shared: Rc::downgrade(self.shared),
            instance: self.instance,
        };
        (value, setter)
    }

    /// Mutable per-instance cell that survives re-renders without
    /// triggering them.
    pub fn use_ref<T: 'static>(&mut self, init: impl FnOnce() -> T) -> Rc<RefCell<T>> {
        let slot = self.next_slot();
        if self.hooks.len() == slot {
            let cell: Rc<RefCell<T>> = Rc::new(RefCell::new(init()));
            self.hooks.push(Hook::Ref(cell));
        }
        let Hook::Ref(any) = &self.hooks[slot] else {
            panic!("hook order changed between renders");
        };
        Rc::clone(any)
            .downcast::<RefCell<T>>()
            .unwrap_or_else(|_| panic!("hook type changed between renders"))
    }

    /// Effect hook: `effect` runs after commit, per the dependency policy,
    /// and may return a cleanup.
    pub fn use_effect(&mut self, deps: Deps, effect: impl FnOnce() -> Cleanup + 'static) {
        let slot = self.next_slot();
        if self.hooks.len() == slot {
            self.hooks.push(Hook::Effect(EffectHook {
                deps,
                cleanup: None,
                pending: Some(Box::new(effect)),
            }));
            self.scheduled_effects.push(slot);
            return;
        }
        let Hook::Effect(hook) = &mut self.hooks[slot] else {
            panic!("hook order changed between renders");
        };
        let rerun = match (&hook.deps, &deps) {
            (_, Deps::Always) => true,
            (_, Deps::Once) => false,
            (Deps::Keyed(old), Deps::Keyed(new)) => old != new,
            _ => true,
        };
        hook.deps = deps;
        if rerun {
            hook.pending = Some(Box::new(effect));
            self.scheduled_effects.push(slot);
        }
    }

    /// Nearest context value of type `T`, if any provider encloses this
    /// instance.
    #[must_use]
    pub fn context<T: Clone + 'static>(&self) -> Option<T> {
        self.context.lookup::<T>()
    }

    fn next_slot(&mut self) -> usize {
        let slot = self.cursor;
        self.cursor += 1;
        assert!(
            slot <= self.hooks.len(),
            "hook cursor ran past the hook list"
        );
        slot
    }
}

/// Shared handle to a tree runtime.
#[derive(Clone)]
pub struct TreeRuntime {
    shared: Rc<RuntimeShared>,
}

impl TreeRuntime {
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Rc::new(RuntimeShared {
                instances: RefCell::new(AHashMap::new()),
                render_queue: RefCell::new(VecDeque::new()),
                effect_queue: RefCell::new(VecDeque::new()),
                next_instance: Cell::new(1),
                flushing: Cell::new(false),
            }),
        }
    }

    /// Mount an element into a target surface and flush.
    #[must_use]
    pub fn mount(&self, element: Element, target: &SurfaceNode) -> MountHandle {
        let name = element.component().name().to_string();
        let id = self.spawn_instance(element, ContextStack::default(), target.clone());
        self.flush();
        tracing::debug!(target: "weft.tree", instance = id, component = %name, "mounted root");
        MountHandle {
            runtime: self.clone(),
            root: id,
            mounted: Cell::new(true),
        }
    }

    /// Process pending re-renders and effects until quiescent. Returns
    /// whether any work ran.
    pub fn flush(&self) -> bool {
        if self.shared.flushing.get() {
            return false;
        }
        self.shared.flushing.set(true);
        let mut did_work = false;
        loop {
            let next_render = self.shared.render_queue.borrow_mut().pop_front();
            if let Some(id) = next_render {
                did_work = true;
                self.render_instance(id);
                continue;
            }
            let next_effect = self.shared.effect_queue.borrow_mut().pop_front();
            if let Some((id, slot)) = next_effect {
                did_work = true;
                self.run_effect(id, slot);
                continue;
            }
            break;
        }
        self.shared.flushing.set(false);
        did_work
    }

    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.shared.instances.borrow().len()
    }

    // --- instance lifecycle ------------------------------------------------

    fn spawn_instance(&self, element: Element, context: ContextStack, parent: SurfaceNode) -> u64 {
        let id = self.shared.next_instance.get();
        self.shared.next_instance.set(id + 1);
        let instance = Instance {
            element,
            context,
            parent_surface: parent,
            hooks: Vec::new(),
            committed: None,
            dirty: false,
            alive: true,
        };
        self.shared
            .instances
            .borrow_mut()
            .insert(id, Rc::new(RefCell::new(instance)));
        self.render_instance(id);
        id
    }

    fn render_instance(&self, id: u64) {
        let inst_rc = self.shared.instances.borrow().get(&id).cloned();
        let Some(inst_rc) = inst_rc else { return };

        let (component, props, context, parent_surface, old_committed, mut hooks) = {
            let mut inst = inst_rc.borrow_mut();
            if !inst.alive {
                return;
            }
            inst.dirty = false;
            (
                inst.element.component(),
                inst.element.props().clone(),
                inst.context.clone(),
                inst.parent_surface.clone(),
                inst.committed.take(),
                std::mem::take(&mut inst.hooks),
            )
        };

        let mut cx = ViewCx {
            hooks: &mut hooks,
            cursor: 0,
            props: &props,
            context: &context,
            shared: &self.shared,
            instance: id,
            scheduled_effects: Vec::new(),
        };
        let view = component.render(&mut cx);
        let scheduled = std::mem::take(&mut cx.scheduled_effects);
        drop(cx);

        {
            let mut inst = inst_rc.borrow_mut();
            inst.hooks = hooks;
        }

        let committed = self.commit(old_committed, view, &parent_surface, &context);
        {
            let mut inst = inst_rc.borrow_mut();
            inst.committed = Some(committed);
        }

        let mut effect_queue = self.shared.effect_queue.borrow_mut();
        for slot in scheduled {
            effect_queue.push_back((id, slot));
        }
    }

    fn run_effect(&self, id: u64, slot: usize) {
        let inst_rc = self.shared.instances.borrow().get(&id).cloned();
        let Some(inst_rc) = inst_rc else { return };

        let work = {
            let mut inst = inst_rc.borrow_mut();
            if !inst.alive {
                None
            } else {
                match inst.hooks.get_mut(slot) {
                    Some(Hook::Effect(hook)) => {
                        hook.pending.take().map(|p| (hook.cleanup.take(), p))
                    }
                    _ => None,
                }
            }
        };

        let Some((old_cleanup, pending)) = work else {
            return;
        };
        if let Some(old_cleanup) = old_cleanup {
            old_cleanup();
        }
        let new_cleanup = pending();

        let mut leftover: Cleanup = None;
        {
            let mut inst = inst_rc.borrow_mut();
            if inst.alive {
                if let Some(Hook::Effect(hook)) = inst.hooks.get_mut(slot) {
                    hook.cleanup = new_cleanup;
                } else {
                    leftover = new_cleanup;
                }
            } else {
                leftover = new_cleanup;
            }
        }
        // The instance died while its own effect ran: tear down immediately.
        if let Some(c) = leftover {
            c();
        }
    }

    fn unmount_instance(&self, id: u64) {
        let inst_rc = self.shared.instances.borrow_mut().remove(&id);
        let Some(inst_rc) = inst_rc else { return };

        let (committed, hooks) = {
            let mut inst = inst_rc.borrow_mut();
            inst.alive = false;
            (inst.committed.take(), std::mem::take(&mut inst.hooks))
        };

        // Children first, then own cleanups in reverse registration order.
        if let Some(committed) = committed {
            self.unmount_committed(committed);
        }
        for hook in hooks.into_iter().rev() {
            if let Hook::Effect(mut effect) = hook
                && let Some(cleanup) = effect.cleanup.take()
            {
                cleanup();
            }
        }
        tracing::debug!(target: "weft.tree", instance = id, "unmounted instance");
    }

    fn update_child(&self, id: u64, element: Element, parent: &SurfaceNode, context: &ContextStack) {
        let inst_rc = self.shared.instances.borrow().get(&id).cloned();
        let Some(inst_rc) = inst_rc else { return };
        let rerender = {
            let mut inst = inst_rc.borrow_mut();
            if !inst.alive {
                return;
            }
            inst.context = context.clone();
            inst.parent_surface = parent.clone();
            let skip = element.is_memo() && *inst.element.props() == *element.props();
            inst.element = element;
            !skip
        };
        if rerender {
            self.render_instance(id);
        }
    }

    pub(crate) fn update_instance_props(&self, id: u64, props: PropBag) {
        let inst_rc = self.shared.instances.borrow().get(&id).cloned();
        let Some(inst_rc) = inst_rc else { return };
        let rerender = {
            let mut inst = inst_rc.borrow_mut();
            if !inst.alive {
                return;
            }
            let skip = inst.element.is_memo() && *inst.element.props() == props;
            inst.element = inst.element.with_props(props);
            !skip
        };
        if rerender {
            self.render_instance(id);
        }
    }

    fn child_matches(&self, id: u64, element: &Element) -> bool {
        self.shared
            .instances
            .borrow()
            .get(&id)
            .is_some_and(|rc| {
                let inst = rc.borrow();
                inst.alive
                    && inst.element.same_component(element)
                    && inst.element.key() == element.key()
            })
    }

    // --- commit ------------------------------------------------------------

    fn commit(
        &self,
        old: Option<Committed>,
        view: View,
        parent: &SurfaceNode,
        context: &ContextStack,
    ) -> Committed {
        match view {
            View::Empty => {
                if let Some(old) = old {
                    self.unmount_committed(old);
                }
                Committed::Empty
            }

            View::Surface(decl) => match old {
                Some(Committed::Surface {
                    node,
                    parent: old_parent,
                    node_ref: old_ref,
                }) if node.tag() == decl.tag && old_parent.same_node(parent) => {
                    node.sync_raw_attrs(&decl.attrs);
                    if let Some(old_ref) = &old_ref
                        && decl.node_ref.as_ref().is_none_or(|r| !r.same_ref(old_ref))
                    {
                        old_ref.clear();
                    }
                    if let Some(new_ref) = &decl.node_ref {
                        new_ref.set(node.clone());
                    }
                    Committed::Surface {
                        node,
                        parent: parent.clone(),
                        node_ref: decl.node_ref,
                    }
                }
                other => {
                    if let Some(old) = other {
                        self.unmount_committed(old);
                    }
                    let node = SurfaceNode::new(&decl.tag);
                    node.sync_raw_attrs(&decl.attrs);
                    parent.append_child(&node);
                    if let Some(new_ref) = &decl.node_ref {
                        new_ref.set(node.clone());
                    }
                    Committed::Surface {
                        node,
                        parent: parent.clone(),
                        node_ref: decl.node_ref,
                    }
                }
            },

            View::Child(element) => match old {
                Some(Committed::Child(child_id)) if self.child_matches(child_id, &element) => {
                    self.update_child(child_id, element, parent, context);
                    Committed::Child(child_id)
                }
                other => {
                    if let Some(old) = other {
                        self.unmount_committed(old);
                    }
                    let child_id = self.spawn_instance(element, context.clone(), parent.clone());
                    Committed::Child(child_id)
                }
            },

            View::Group(items) => {
                let mut old_by_key: AHashMap<u64, Committed> = match old {
                    Some(Committed::Group(entries)) => entries.into_iter().collect(),
                    Some(other) => {
                        self.unmount_committed(other);
                        AHashMap::new()
                    }
                    None => AHashMap::new(),
                };
                let mut out = Vec::with_capacity(items.len());
                for (key, child_view) in items {
                    let old_entry = old_by_key.remove(&key);
                    let committed = self.commit(old_entry, child_view, parent, context);
                    out.push((key, committed));
                }
                for (_, stale) in old_by_key {
                    self.unmount_committed(stale);
                }
                Committed::Group(out)
            }

            View::Provide { value, child } => {
                let pushed = context.push(value);
                let inner_old = match old {
                    Some(Committed::Provide(inner)) => Some(*inner),
                    Some(other) => {
                        self.unmount_committed(other);
                        None
                    }
                    None => None,
                };
                Committed::Provide(Box::new(self.commit(inner_old, *child, parent, &pushed)))
            }

            View::Portal { target, child } => match old {
                Some(Committed::Portal {
                    target: old_target,
                    inner,
                }) if old_target.same_node(&target) => {
                    let committed = self.commit(Some(*inner), *child, &target, context);
                    Committed::Portal {
                        target,
                        inner: Box::new(committed),
                    }
                }
                other => {
                    if let Some(old) = other {
                        self.unmount_committed(old);
                    }
                    let committed = self.commit(None, *child, &target, context);
                    Committed::Portal {
                        target,
                        inner: Box::new(committed),
                    }
                }
            },
        }
    }

    fn unmount_committed(&self, committed: Committed) {
        match committed {
            Committed::Empty => {}
            Committed::Surface {
                node,
                parent,
                node_ref,
            } => {
                parent.remove_child(&node);
                if let Some(node_ref) = node_ref {
                    node_ref.clear();
                }
            }
            Committed::Child(id) => self.unmount_instance(id),
            Committed::Group(items) => {
                for (_, inner) in items {
                    self.unmount_committed(inner);
                }
            }
            Committed::Provide(inner) => self.unmount_committed(*inner),
            Committed::Portal { inner, .. } => self.unmount_committed(*inner),
        }
    }
}

impl Default for TreeRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TreeRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeRuntime")
            .field("instances", &self.instance_count())
            .field("flushing", &self.shared.flushing.get())
            .finish()
    }
}

/// Handle to a mounted root.
///
/// Unmounting is explicit; dropping the handle leaves the tree mounted.
pub struct MountHandle {
    runtime: TreeRuntime,
    root: u64,
    mounted: Cell<bool>,
}

impl MountHandle {
    /// Replace the root element's props (memo applies) and flush.
    pub fn update(&self, props: PropBag) {
        if !self.mounted.get() {
            return;
        }
        self.runtime.update_instance_props(self.root, props);
        self.runtime.flush();
    }

    /// Unmount the tree. Idempotent.
    pub fn unmount(&self) {
        if self.mounted.replace(false) {
            self.runtime.unmount_instance(self.root);
            self.runtime.flush();
        }
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.mounted.get()
    }
}

impl fmt::Debug for MountHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountHandle")
            .field("root", &self.root)
            .field("mounted", &self.mounted.get())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{SurfaceDecl, component, memo_component};

    fn label_component() -> crate::element::ComponentRef {
        component("label", |cx| {
            View::Surface(
                SurfaceDecl::new("label").attr("text", cx.props().value("text").render_text()),
            )
        })
    }

    #[test]
    fn mount_commits_surface_into_target() {
        let rt = TreeRuntime::new();
        let root = SurfaceNode::new("root");
        let mut props = PropBag::new();
        props.set("text", "hello");

        let handle = rt.mount(Element::new(label_component(), props), &root);

        let children = root.children();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].tag(), "label");
        assert_eq!(children[0].raw_attr("text").as_deref(), Some("hello"));
        assert!(handle.is_mounted());
    }

    #[test]
    fn update_rerenders_in_place() {
        let rt = TreeRuntime::new();
        let root = SurfaceNode::new("root");
        let mut props = PropBag::new();
        props.set("text", "a");
        let handle = rt.mount(Element::new(label_component(), props), &root);

        let first = root.children()[0].clone();
        let mut props2 = PropBag::new();
        props2.set("text", "b");
        handle.update(props2);

        let children = root.children();
        assert_eq!(children.len(), 1);
        assert!(children[0].same_node(&first), "node reused, not replaced");
        assert_eq!(children[0].raw_attr("text").as_deref(), Some("b"));
    }

    #[test]
    fn unmount_detaches_and_is_idempotent() {
        let rt = TreeRuntime::new();
        let root = SurfaceNode::new("root");
        let handle = rt.mount(Element::new(label_component(), PropBag::new()), &root);
        assert_eq!(root.child_count(), 1);

        handle.unmount();
        assert_eq!(root.child_count(), 0);
        assert_eq!(rt.instance_count(), 0);

        handle.unmount();
        assert!(!handle.is_mounted());
    }

    #[test]
    fn state_setter_drives_rerender_on_flush() {
        let rt = TreeRuntime::new();
        let root = SurfaceNode::new("root");
        let setter_out: Rc<RefCell<Option<StateSetter<i64>>>> = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&setter_out);

        let counter = component("counter", move |cx| {
            let (count, set_count) = cx.use_state(|| 0i64);
            *sink.borrow_mut() = Some(set_count);
            View::Surface(SurfaceDecl::new("count").attr("value", count.to_string()))
        });

        let _handle = rt.mount(Element::new(counter, PropBag::new()), &root);
        assert_eq!(root.children()[0].raw_attr("value").as_deref(), Some("0"));

        let setter = setter_out.borrow().clone().unwrap();
        setter.set(3);
        assert!(rt.flush());
        assert_eq!(root.children()[0].raw_attr("value").as_deref(), Some("3"));

        // Equal value: no work.
        setter.set(3);
        assert!(!rt.flush());
    }

    #[test]
    fn effects_run_after_commit_with_deps_policies() {
        let rt = TreeRuntime::new();
        let root = SurfaceNode::new("root");
        let log: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));

        let log1 = Rc::clone(&log);
        let comp = component("fx", move |cx| {
            let always_log = Rc::clone(&log1);
            cx.use_effect(Deps::Always, move || {
                always_log.borrow_mut().push("always".into());
                None
            });
            let once_log = Rc::clone(&log1);
            cx.use_effect(Deps::Once, move || {
                once_log.borrow_mut().push("once".into());
                None
            });
            let keyed_log = Rc::clone(&log1);
            let key = cx.props().value("k");
            cx.use_effect(Deps::Keyed(vec![key]), move || {
                keyed_log.borrow_mut().push("keyed".into());
                None
            });
            View::Empty
        });

        let mut props = PropBag::new();
        props.set("k", 1i64);
        let handle = rt.mount(Element::new(comp, props.clone()), &root);
        assert_eq!(*log.borrow(), vec!["always", "once", "keyed"]);

        // Same key: only the Always effect re-runs.
        log.borrow_mut().clear();
        handle.update(props.clone());
        assert_eq!(*log.borrow(), vec!["always"]);

        // Key change: keyed re-runs too.
        log.borrow_mut().clear();
        let mut props2 = props.clone();
        props2.set("k", 2i64);
        handle.update(props2);
        assert_eq!(*log.borrow(), vec!["always", "keyed"]);
    }

    #[test]
    fn cleanups_run_in_reverse_order_on_unmount() {
        let rt = TreeRuntime::new();
        let root = SurfaceNode::new("root");
        let log: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));

        let log1 = Rc::clone(&log);
        let comp = component("fx", move |cx| {
            let a = Rc::clone(&log1);
            cx.use_effect(Deps::Once, move || cleanup(move || a.borrow_mut().push("a")));
            let b = Rc::clone(&log1);
            cx.use_effect(Deps::Once, move || cleanup(move || b.borrow_mut().push("b")));
            View::Empty
        });

        let handle = rt.mount(Element::new(comp, PropBag::new()), &root);
        assert!(log.borrow().is_empty());

        handle.unmount();
        assert_eq!(*log.borrow(), vec!["b", "a"]);
    }

    #[test]
    fn always_effect_cleans_up_previous_run() {
        let rt = TreeRuntime::new();
        let root = SurfaceNode::new("root");
        let log: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));

        let log1 = Rc::clone(&log);
        let comp = component("fx", move |cx| {
            let run_log = Rc::clone(&log1);
            let n = cx.props().value("n").render_text();
            cx.use_effect(Deps::Always, move || {
                run_log.borrow_mut().push(format!("run {n}"));
                let clean_log = Rc::clone(&run_log);
                cleanup(move || clean_log.borrow_mut().push(format!("clean {n}")))
            });
            View::Empty
        });

        let mut props = PropBag::new();
        props.set("n", 1i64);
        let handle = rt.mount(Element::new(comp, props), &root);
        let mut props2 = PropBag::new();
        props2.set("n", 2i64);
        handle.update(props2);

        assert_eq!(
            *log.borrow(),
            vec!["run 1".to_string(), "clean 1".into(), "run 2".into()]
        );
    }

    #[test]
    fn memo_component_skips_equal_props() {
        let rt = TreeRuntime::new();
        let root = SurfaceNode::new("root");
        let renders = Rc::new(Cell::new(0u32));

        let counter = Rc::clone(&renders);
        let comp = memo_component("memo", move |_cx| {
            counter.set(counter.get() + 1);
            View::Empty
        });

        let mut props = PropBag::new();
        props.set("x", 1i64);
        let handle = rt.mount(Element::new(comp, props.clone()), &root);
        assert_eq!(renders.get(), 1);

        handle.update(props.clone());
        assert_eq!(renders.get(), 1, "equal props skip the render");

        let mut props2 = props.clone();
        props2.set("x", 2i64);
        handle.update(props2);
        assert_eq!(renders.get(), 2);
    }

    #[test]
    fn child_identity_swap_remounts() {
        let rt = TreeRuntime::new();
        let root = SurfaceNode::new("root");
        let log: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));

        let make_leaf = |tag: &'static str, log: Rc<RefCell<Vec<String>>>| {
            component(tag, move |cx| {
                let l = Rc::clone(&log);
                cx.use_effect(Deps::Once, move || {
                    l.borrow_mut().push(format!("mount {tag}"));
                    let l2 = Rc::clone(&l);
                    cleanup(move || l2.borrow_mut().push(format!("unmount {tag}")))
                });
                View::Surface(SurfaceDecl::new(tag))
            })
        };
        let leaf_a = make_leaf("a", Rc::clone(&log));
        let leaf_b = make_leaf("b", Rc::clone(&log));

        let parent = component("parent", move |cx| {
            let which = cx.props().value("which");
            let leaf = if which == PropValue::str("a") {
                Rc::clone(&leaf_a)
            } else {
                Rc::clone(&leaf_b)
            };
            View::Child(Element::new(leaf, PropBag::new()))
        });

        let mut props = PropBag::new();
        props.set("which", "a");
        let handle = rt.mount(Element::new(parent, props), &root);
        assert_eq!(root.children()[0].tag(), "a");

        let mut props2 = PropBag::new();
        props2.set("which", "b");
        handle.update(props2);
        assert_eq!(root.children()[0].tag(), "b");
        assert_eq!(
            *log.borrow(),
            vec!["mount a", "unmount a", "mount b"]
        );
    }

    #[test]
    fn keyed_group_reconciles_by_key() {
        let rt = TreeRuntime::new();
        let root = SurfaceNode::new("root");

        let item = component("item", |cx| {
            View::Surface(SurfaceDecl::new("item").attr("id", cx.props().value("id").render_text()))
        });

        let item2 = Rc::clone(&item);
        let list = component("list", move |cx| {
            let keys = match cx.props().value("keys") {
                PropValue::List(keys) => keys,
                _ => vec![],
            };
            let children = keys
                .iter()
                .filter_map(PropValue::as_int)
                .map(|k| {
                    let mut props = PropBag::new();
                    props.set("id", k);
                    (
                        k as u64,
                        View::Child(Element::new(Rc::clone(&item2), props).with_key(k as u64)),
                    )
                })
                .collect();
            View::Group(children)
        });

        let mut props = PropBag::new();
        props.set(
            "keys",
            PropValue::List(vec![PropValue::Int(1), PropValue::Int(2)]),
        );
        let handle = rt.mount(Element::new(list, props), &root);
        assert_eq!(root.child_count(), 2);
        let kept = root.children()[1].clone();
        assert_eq!(kept.raw_attr("id").as_deref(), Some("2"));

        // Drop key 1, keep key 2: the kept child's surface survives.
        let mut props2 = PropBag::new();
        props2.set("keys", PropValue::List(vec![PropValue::Int(2)]));
        handle.update(props2);
        let children = root.children();
        assert_eq!(children.len(), 1);
        assert!(children[0].same_node(&kept));
    }

    #[test]
    fn portal_projects_into_target_surface() {
        let rt = TreeRuntime::new();
        let root = SurfaceNode::new("root");
        let elsewhere = SurfaceNode::new("elsewhere");

        let inner = component("inner", |_| View::Surface(SurfaceDecl::new("projected")));
        let elsewhere2 = elsewhere.clone();
        let outer = component("outer", move |_| {
            View::portal(
                elsewhere2.clone(),
                View::Child(Element::new(Rc::clone(&inner), PropBag::new())),
            )
        });

        let handle = rt.mount(Element::new(outer, PropBag::new()), &root);
        assert_eq!(root.child_count(), 0, "nothing lands in the logical parent");
        assert_eq!(elsewhere.child_count(), 1);
        assert_eq!(elsewhere.children()[0].tag(), "projected");

        handle.unmount();
        assert_eq!(elsewhere.child_count(), 0);
    }

    #[test]
    fn context_reaches_portal_subtrees() {
        #[derive(Clone, PartialEq, Debug)]
        struct Theme(String);

        let rt = TreeRuntime::new();
        let root = SurfaceNode::new("root");
        let target = SurfaceNode::new("target");
        let seen: Rc<RefCell<Option<Theme>>> = Rc::new(RefCell::new(None));

        let sink = Rc::clone(&seen);
        let leaf = component("leaf", move |cx| {
            *sink.borrow_mut() = cx.context::<Theme>();
            View::Empty
        });

        let target2 = target.clone();
        let outer = component("outer", move |_| {
            View::provide(
                Theme("dark".into()),
                View::portal(
                    target2.clone(),
                    View::Child(Element::new(Rc::clone(&leaf), PropBag::new())),
                ),
            )
        });

        let _handle = rt.mount(Element::new(outer, PropBag::new()), &root);
        assert_eq!(*seen.borrow(), Some(Theme("dark".into())));
    }

    #[test]
    fn node_ref_is_filled_at_commit_and_cleared_on_unmount() {
        let rt = TreeRuntime::new();
        let root = SurfaceNode::new("root");
        let node_ref = NodeRef::new();

        let r = node_ref.clone();
        let comp = component("host", move |_| {
            View::Surface(SurfaceDecl::new("host").with_ref(r.clone()))
        });

        let handle = rt.mount(Element::new(comp, PropBag::new()), &root);
        let filled = node_ref.get().expect("ref filled at commit");
        assert_eq!(filled.tag(), "host");

        handle.unmount();
        assert!(node_ref.get().is_none());
    }

    #[test]
    fn setter_is_inert_after_unmount() {
        let rt = TreeRuntime::new();
        let root = SurfaceNode::new("root");
        let setter_out: Rc<RefCell<Option<StateSetter<i64>>>> = Rc::new(RefCell::new(None));

        let sink = Rc::clone(&setter_out);
        let comp = component("c", move |cx| {
            let (_, set) = cx.use_state(|| 0i64);
            *sink.borrow_mut() = Some(set);
            View::Empty
        });

        let handle = rt.mount(Element::new(comp, PropBag::new()), &root);
        handle.unmount();

        let setter = setter_out.borrow().clone().unwrap();
        setter.set(5);
        assert!(!rt.flush(), "no work scheduled for a dead instance");
    }

    #[test]
    fn effect_setting_state_rerenders_within_same_flush() {
        let rt = TreeRuntime::new();
        let root = SurfaceNode::new("root");

        let comp = component("self-heal", move |cx| {
            let (phase, set_phase) = cx.use_state(|| 0i64);
            cx.use_effect(Deps::Once, move || {
                set_phase.set(1);
                None
            });
            View::Surface(SurfaceDecl::new("p").attr("phase", phase.to_string()))
        });

        let _handle = rt.mount(Element::new(comp, PropBag::new()), &root);
        // mount() flushes: the effect's state write re-rendered already.
        assert_eq!(root.children()[0].raw_attr("phase").as_deref(), Some("1"));
    }
}
