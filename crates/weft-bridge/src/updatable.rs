#![forbid(unsafe_code)]

//! The updatable wrapper.
//!
//! A stable element whose props can be imperatively replaced after mount,
//! so a scope-side controller can push new binding values without
//! remounting the wrapped component. The controller holds an
//! [`UpdatableHandle`]; the wrapper publishes its state setter into the
//! handle while mounted and vacates it on unmount, making late
//! `update_props` calls silent no-ops (scope-side teardown is scheduled
//! asynchronously, so such calls are expected, not errors).
//!
//! The initial bag is read from a shared cell at first render rather than
//! captured at element creation, so a wrapper that mounts after several
//! change batches still starts from the latest merged values.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use weft_core::PropBag;
use weft_tree::{Cleanup, ComponentRef, Deps, Element, StateSetter, View, component};

/// Imperative prop-replacement handle for a mounted updatable wrapper.
#[derive(Clone, Default)]
pub struct UpdatableHandle {
    slot: Rc<RefCell<Option<StateSetter<PropBag>>>>,
}

impl UpdatableHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a new prop bag to the mounted wrapper. No-op once the wrapper
    /// has unmounted.
    pub fn update_props(&self, props: PropBag) {
        match &*self.slot.borrow() {
            Some(setter) => setter.set(props),
            None => {
                tracing::trace!(
                    target: "weft.bridge",
                    "update_props on a vacated handle; ignoring"
                );
            }
        }
    }

    /// Whether a wrapper is currently mounted behind this handle.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.slot.borrow().is_some()
    }

    pub(crate) fn attach(&self, setter: StateSetter<PropBag>) {
        *self.slot.borrow_mut() = Some(setter);
    }

    pub(crate) fn detach(&self) {
        *self.slot.borrow_mut() = None;
    }
}

impl fmt::Debug for UpdatableHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdatableHandle")
            .field("live", &self.is_live())
            .finish()
    }
}

/// Build the updatable wrapper element around `inner`.
///
/// `bindings` is the controller's live binding bag (read at first render);
/// `services` are merged over the bindings on every render as fixed,
/// non-reactive props.
#[must_use]
pub fn updatable_element(
    inner: ComponentRef,
    bindings: Rc<RefCell<PropBag>>,
    services: PropBag,
    handle: UpdatableHandle,
) -> Element {
    let wrapper = component("updatable", move |cx| {
        let live_initial = Rc::clone(&bindings);
        let (bag, set_bag) = cx.use_state(move || live_initial.borrow().clone());

        {
            let handle = handle.clone();
            let setter = set_bag.clone();
            cx.use_effect(Deps::Once, move || -> Cleanup {
                handle.attach(setter);
                let handle = handle.clone();
                Some(Box::new(move || handle.detach()))
            });
        }

        let mut merged = bag.clone();
        merged.merge(&services);
        View::Child(Element::new(inner.clone(), merged))
    });
    Element::new(wrapper, PropBag::new())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
