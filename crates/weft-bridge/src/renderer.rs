#![forbid(unsafe_code)]

//! The portal renderer.
//!
//! A single long-lived component that subscribes to a [`PortalRegistry`]
//! and projects every live entry into its target surface, wrapping each
//! projection in an injector provider so capability lookups inside the
//! projected tree resolve against the entry's originating container.
//! Entries are keyed by their registry id, so replacement under the same
//! target reconciles against the same slot.
//!
//! Mounting a second renderer against the same registry is setup misuse
//! and fails hard (the registry supports one subscriber at a time).

use weft_core::PropBag;
use weft_tree::{Deps, Element, View, cleanup, component};

use crate::registry::{PortalRegistry, PortalEntry, RegistryOp};

/// Build the renderer element for a registry.
#[must_use]
pub fn portal_renderer(registry: &PortalRegistry) -> Element {
    let registry = registry.clone();
    let renderer = component("portal-renderer", move |cx| {
        let (entries, set_entries) = cx.use_state(Vec::<PortalEntry>::new);

        {
            let registry = registry.clone();
            let set_entries = set_entries.clone();
            cx.use_effect(Deps::Once, move || {
                let apply = move |op: RegistryOp| match op {
                    RegistryOp::Add(entry) => {
                        set_entries.update(move |list| list.push(entry));
                    }
                    RegistryOp::Remove { token } => {
                        set_entries.update(move |list| list.retain(|e| e.token() != token));
                    }
                };
                match registry.subscribe(apply) {
                    Ok(subscription) => cleanup(move || subscription.unsubscribe()),
                    Err(err) => panic!("cannot mount portal renderer: {err}"),
                }
            });
        }

        let children = entries
            .iter()
            .map(|entry| {
                (
                    entry.id(),
                    View::provide(
                        entry.injector().clone(),
                        View::portal(
                            entry.target().clone(),
                            View::Child(entry.element().clone()),
                        ),
                    ),
                )
            })
            .collect();
        View::Group(children)
    });
    Element::new(renderer, PropBag::new())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
