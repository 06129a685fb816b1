#![forbid(unsafe_code)]

//! The portal registry.
//!
//! # Design
//!
//! The registry is an explicit, clonable instance - constructor-injected
//! into both adapters - holding the set of component definitions waiting to
//! be projected. While a renderer is subscribed, add/remove requests apply
//! to it immediately; with no renderer, additions accumulate in a pending
//! queue that is drained exactly once, in insertion order, the moment a
//! renderer subscribes.
//!
//! # Invariants
//!
//! 1. At most one live entry per target surface: re-registering a surface
//!    removes the prior entry first and reuses its id.
//! 2. Ids are otherwise monotonically increasing and never recycled.
//! 3. Removal works identically whether the entry is live or queued, and
//!    always clears the identity cache used for replacement detection.
//! 4. At most one renderer subscription at a time; a second subscription
//!    attempt is rejected with [`RegistryError::RendererAlreadyMounted`].
//! 5. Unsubscribing drops nothing: the registry reverts to queueing new
//!    additions.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use weft_core::SurfaceNode;
use weft_scope::Injector;
use weft_tree::Element;

/// Registry misuse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A renderer is already subscribed; concurrent renderers are not
    /// supported.
    RendererAlreadyMounted,
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RendererAlreadyMounted => {
                write!(f, "a portal renderer is already subscribed to this registry")
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// A component definition requested for projection.
#[derive(Clone, Debug)]
pub struct ComponentDefinition {
    /// The element to project.
    pub element: Element,
    /// The surface to project it into.
    pub target: SurfaceNode,
    /// The capability injector of the originating container.
    pub injector: Injector,
}

/// A registered definition with its stable identity.
#[derive(Clone, Debug)]
pub struct PortalEntry {
    id: u64,
    token: u64,
    element: Element,
    target: SurfaceNode,
    injector: Injector,
}

impl PortalEntry {
    /// Stable per-target id, reused across replacement.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn element(&self) -> &Element {
        &self.element
    }

    #[must_use]
    pub fn target(&self) -> &SurfaceNode {
        &self.target
    }

    #[must_use]
    pub fn injector(&self) -> &Injector {
        &self.injector
    }

    /// Unique per registration (unlike `id`, never reused).
    pub(crate) fn token(&self) -> u64 {
        self.token
    }
}

impl PartialEq for PortalEntry {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token
    }
}

/// An update applied to the subscribed renderer's live set.
#[derive(Clone, Debug)]
pub enum RegistryOp {
    Add(PortalEntry),
    Remove { token: u64 },
}

type SubscriberFn = Rc<dyn Fn(RegistryOp)>;

struct TargetEntry {
    target: SurfaceNode,
    id: u64,
    token: u64,
}

struct RegistryInner {
    next_id: u64,
    next_token: u64,
    subscriber: Option<SubscriberFn>,
    pending: Vec<PortalEntry>,
    targets: Vec<TargetEntry>,
}

/// Shared handle to a portal registry.
#[derive(Clone)]
pub struct PortalRegistry {
    inner: Rc<RefCell<RegistryInner>>,
}

impl PortalRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(RegistryInner {
                next_id: 0,
                next_token: 0,
                subscriber: None,
                pending: Vec::new(),
                targets: Vec::new(),
            })),
        }
    }

    /// Register a definition. Returns the handle that deregisters it.
    ///
    /// A definition targeting an already-registered surface replaces the
    /// prior entry and inherits its id.
    #[must_use]
    pub fn add_definition(&self, def: ComponentDefinition) -> RemoveHandle {
        let mut ops: Vec<RegistryOp> = Vec::new();
        let (token, subscriber) = {
            let mut inner = self.inner.borrow_mut();

            let existing = inner
                .targets
                .iter()
                .position(|t| t.target.same_node(&def.target));
            let id = match existing {
                Some(index) => {
                    let prior = inner.targets.remove(index);
                    if inner.subscriber.is_some() {
                        ops.push(RegistryOp::Remove { token: prior.token });
                    } else {
                        inner.pending.retain(|e| e.token != prior.token);
                    }
                    tracing::debug!(
                        target: "weft.bridge",
                        id = prior.id,
                        surface = def.target.node_id(),
                        "replacing registered entry for target surface"
                    );
                    prior.id
                }
                None => {
                    let id = inner.next_id;
                    inner.next_id += 1;
                    id
                }
            };

            let token = inner.next_token;
            inner.next_token += 1;
            inner.targets.push(TargetEntry {
                target: def.target.clone(),
                id,
                token,
            });

            let entry = PortalEntry {
                id,
                token,
                element: def.element,
                target: def.target,
                injector: def.injector,
            };
            if inner.subscriber.is_some() {
                ops.push(RegistryOp::Add(entry));
            } else {
                inner.pending.push(entry);
            }
            (token, inner.subscriber.clone())
        };

        if let Some(subscriber) = subscriber {
            for op in ops {
                subscriber(op);
            }
        }
        tracing::debug!(target: "weft.bridge", token, "component definition registered");

        RemoveHandle {
            registry: self.clone(),
            token,
            removed: Cell::new(false),
        }
    }

    /// Subscribe the (single) renderer. Pending entries are applied in
    /// insertion order, then cleared.
    pub fn subscribe(
        &self,
        apply: impl Fn(RegistryOp) + 'static,
    ) -> Result<RendererSubscription, RegistryError> {
        let (drained, subscriber) = {
            let mut inner = self.inner.borrow_mut();
            if inner.subscriber.is_some() {
                return Err(RegistryError::RendererAlreadyMounted);
            }
            let subscriber: SubscriberFn = Rc::new(apply);
            inner.subscriber = Some(Rc::clone(&subscriber));
            (std::mem::take(&mut inner.pending), subscriber)
        };
        let drained_count = drained.len();
        for entry in drained {
            subscriber(RegistryOp::Add(entry));
        }
        tracing::debug!(
            target: "weft.bridge",
            drained = drained_count,
            "renderer subscribed; pending queue drained"
        );
        Ok(RendererSubscription {
            registry: self.clone(),
            active: Cell::new(true),
        })
    }

    fn remove_token(&self, token: u64) {
        let subscriber = {
            let mut inner = self.inner.borrow_mut();
            inner.targets.retain(|t| t.token != token);
            if inner.subscriber.is_some() {
                inner.subscriber.clone()
            } else {
                inner.pending.retain(|e| e.token != token);
                None
            }
        };
        if let Some(subscriber) = subscriber {
            subscriber(RegistryOp::Remove { token });
        }
        tracing::debug!(target: "weft.bridge", token, "component definition removed");
    }

    fn unsubscribe(&self) {
        self.inner.borrow_mut().subscriber = None;
        tracing::debug!(target: "weft.bridge", "renderer unsubscribed; reverting to queueing");
    }

    /// Number of entries queued for a future renderer.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.inner.borrow().pending.len()
    }

    /// Number of registered (live or queued) definitions.
    #[must_use]
    pub fn registered_len(&self) -> usize {
        self.inner.borrow().targets.len()
    }

    #[must_use]
    pub fn has_subscriber(&self) -> bool {
        self.inner.borrow().subscriber.is_some()
    }
}

impl Default for PortalRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PortalRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("PortalRegistry")
            .field("registered", &inner.targets.len())
            .field("pending", &inner.pending.len())
            .field("subscribed", &inner.subscriber.is_some())
            .finish()
    }
}

/// Deregistration handle returned by [`PortalRegistry::add_definition`].
pub struct RemoveHandle {
    registry: PortalRegistry,
    token: u64,
    removed: Cell<bool>,
}

impl RemoveHandle {
    /// Remove the registered definition. Idempotent; a handle whose entry
    /// was replaced removes nothing.
    pub fn remove(&self) {
        if self.removed.replace(true) {
            return;
        }
        self.registry.remove_token(self.token);
    }
}

impl fmt::Debug for RemoveHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoveHandle")
            .field("token", &self.token)
            .field("removed", &self.removed.get())
            .finish()
    }
}

/// Active renderer subscription; unsubscribes on drop.
pub struct RendererSubscription {
    registry: PortalRegistry,
    active: Cell<bool>,
}

impl RendererSubscription {
    pub fn unsubscribe(&self) {
        if self.active.replace(false) {
            self.registry.unsubscribe();
        }
    }
}

impl Drop for RendererSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for RendererSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererSubscription")
            .field("active", &self.active.get())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use weft_core::PropBag;
    use weft_tree::{View, component};

    fn definition(target: &SurfaceNode) -> ComponentDefinition {
        ComponentDefinition {
            element: Element::new(component("x", |_| View::Empty), PropBag::new()),
            target: target.clone(),
            injector: Injector::new(),
        }
    }

    fn collector() -> (Rc<RefCell<Vec<PortalEntry>>>, impl Fn(RegistryOp) + 'static) {
        let live: Rc<RefCell<Vec<PortalEntry>>> = Rc::new(RefCell::new(Vec::new()));
        let state = Rc::clone(&live);
        let apply = move |op: RegistryOp| match op {
            RegistryOp::Add(entry) => state.borrow_mut().push(entry),
            RegistryOp::Remove { token } => {
                state.borrow_mut().retain(|e| e.token() != token);
            }
        };
        (live, apply)
    }

    #[test]
    fn entries_queue_without_subscriber_in_order() {
        let registry = PortalRegistry::new();
        let a = SurfaceNode::new("a");
        let b = SurfaceNode::new("b");

        let _ra = registry.add_definition(definition(&a));
        let _rb = registry.add_definition(definition(&b));
        assert_eq!(registry.pending_len(), 2);

        let (live, apply) = collector();
        let sub = registry.subscribe(apply).unwrap();

        // Drained exactly once, in original order, then cleared.
        assert_eq!(registry.pending_len(), 0);
        let ids: Vec<u64> = live.borrow().iter().map(PortalEntry::id).collect();
        assert_eq!(ids, vec![0, 1]);
        assert!(live.borrow()[0].target().same_node(&a));
        assert!(live.borrow()[1].target().same_node(&b));

        sub.unsubscribe();
    }

    #[test]
    fn same_target_replaces_and_reuses_id() {
        let registry = PortalRegistry::new();
        let target = SurfaceNode::new("slot");

        let _first = registry.add_definition(definition(&target));
        let _second = registry.add_definition(definition(&target));
        assert_eq!(registry.pending_len(), 1, "one live entry per surface");
        assert_eq!(registry.registered_len(), 1);

        let (live, apply) = collector();
        let _sub = registry.subscribe(apply).unwrap();
        assert_eq!(live.borrow().len(), 1);
        // Id 0 was reused by the replacement (including the very first id).
        assert_eq!(live.borrow()[0].id(), 0);
    }

    #[test]
    fn replacement_keeps_most_recent_element_while_subscribed() {
        let registry = PortalRegistry::new();
        let target = SurfaceNode::new("slot");
        let (live, apply) = collector();
        let _sub = registry.subscribe(apply).unwrap();

        let _first = registry.add_definition(definition(&target));
        let first_token = live.borrow()[0].token();
        let _second = registry.add_definition(definition(&target));

        let live = live.borrow();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].id(), 0);
        assert_ne!(live[0].token(), first_token, "entry itself was replaced");
    }

    #[test]
    fn distinct_targets_get_increasing_ids() {
        let registry = PortalRegistry::new();
        let (live, apply) = collector();
        let _sub = registry.subscribe(apply).unwrap();

        for tag in ["a", "b", "c"] {
            let _r = registry.add_definition(definition(&SurfaceNode::new(tag)));
        }
        let ids: Vec<u64> = live.borrow().iter().map(PortalEntry::id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn remove_applies_to_live_set_or_queue() {
        let registry = PortalRegistry::new();
        let a = SurfaceNode::new("a");

        // Queued removal.
        let ra = registry.add_definition(definition(&a));
        assert_eq!(registry.pending_len(), 1);
        ra.remove();
        assert_eq!(registry.pending_len(), 0);
        assert_eq!(registry.registered_len(), 0);

        // Live removal.
        let (live, apply) = collector();
        let _sub = registry.subscribe(apply).unwrap();
        let rb = registry.add_definition(definition(&a));
        assert_eq!(live.borrow().len(), 1);
        rb.remove();
        assert!(live.borrow().is_empty());
        assert_eq!(registry.registered_len(), 0);

        // Idempotent.
        rb.remove();
    }

    #[test]
    fn stale_remove_after_replacement_removes_nothing() {
        let registry = PortalRegistry::new();
        let target = SurfaceNode::new("slot");
        let (live, apply) = collector();
        let _sub = registry.subscribe(apply).unwrap();

        let first = registry.add_definition(definition(&target));
        let _second = registry.add_definition(definition(&target));
        assert_eq!(live.borrow().len(), 1);

        // The first handle's entry is already gone; the replacement stays.
        first.remove();
        assert_eq!(live.borrow().len(), 1);
        assert_eq!(registry.registered_len(), 1);
    }

    #[test]
    fn second_subscription_is_rejected() {
        let registry = PortalRegistry::new();
        let (_live, apply) = collector();
        let sub = registry.subscribe(apply).unwrap();

        let result = registry.subscribe(|_| {});
        assert!(matches!(
            result.map(|_| ()),
            Err(RegistryError::RendererAlreadyMounted)
        ));

        // After the first unsubscribes, a new renderer may attach.
        sub.unsubscribe();
        let (_live2, apply2) = collector();
        assert!(registry.subscribe(apply2).is_ok());
    }

    #[test]
    fn unsubscribe_reverts_to_queueing_without_dropping_registrations() {
        let registry = PortalRegistry::new();
        let a = SurfaceNode::new("a");
        let (live, apply) = collector();
        let sub = registry.subscribe(apply).unwrap();

        let ra = registry.add_definition(definition(&a));
        assert_eq!(live.borrow().len(), 1);

        sub.unsubscribe();
        assert!(!registry.has_subscriber());

        // New additions queue again; the earlier registration stays known.
        let b = SurfaceNode::new("b");
        let _rb = registry.add_definition(definition(&b));
        assert_eq!(registry.pending_len(), 1);
        assert_eq!(registry.registered_len(), 2);

        // Removal of the formerly-live entry still clears the cache.
        ra.remove();
        assert_eq!(registry.registered_len(), 1);
    }

    #[test]
    fn subscription_drop_unsubscribes() {
        let registry = PortalRegistry::new();
        {
            let (_live, apply) = collector();
            let _sub = registry.subscribe(apply).unwrap();
            assert!(registry.has_subscriber());
        }
        assert!(!registry.has_subscriber());
    }
}
