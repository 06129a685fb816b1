#![forbid(unsafe_code)]

//! Wrapping a tree component as a scope-framework component definition.
//!
//! The produced [`ComponentSpec`] declares one one-way binding per prop
//! name. Its controller:
//!
//! - resolves one service per requested name from the container's
//!   injector, in declared order (missing services are logged and
//!   omitted);
//! - merges every change batch into a live binding bag, pushing the merged
//!   bag through the updatable handle once mounted;
//! - on init (which the framework guarantees happens after the first
//!   change batch) builds the updatable wrapper element and registers it
//!   with the portal registry against the controller's own element;
//! - on destroy deregisters, which unmounts the projection.
//!
//! The host registers the returned spec under whatever name it likes; this
//! adapter never touches the module's registration queue itself.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use weft_core::{PropBag, PropValue, Service, SurfaceNode};
use weft_scope::{ChangeSet, ComponentSpec, Controller, Injector};
use weft_tree::ComponentRef;

use crate::registry::{ComponentDefinition, PortalRegistry, RemoveHandle};
use crate::updatable::{UpdatableHandle, updatable_element};

/// Wrap a tree component as a scope-framework component definition.
///
/// All declared props are one-way bindings; callbacks are passed as
/// function-valued props. Resolved services are handed to the component as
/// additional, fixed props under their service names.
#[must_use]
pub fn tree_to_scope(
    component: ComponentRef,
    prop_names: &[&str],
    service_names: &[&str],
    registry: &PortalRegistry,
) -> ComponentSpec {
    let bindings: BTreeMap<String, String> = prop_names
        .iter()
        .map(|name| ((*name).to_string(), "<".to_string()))
        .collect();
    let service_names: Vec<String> = service_names.iter().map(|s| (*s).to_string()).collect();
    let registry = registry.clone();

    ComponentSpec::new(bindings).with_controller(move |deps| {
        let mut services = BTreeMap::new();
        for name in &service_names {
            match deps.injector.get(name) {
                Ok(service) => {
                    services.insert(name.clone(), service);
                }
                Err(err) => {
                    tracing::warn!(
                        target: "weft.bridge",
                        service = %name,
                        error = %err,
                        "service unavailable; omitting from wrapped component props"
                    );
                }
            }
        }
        Box::new(ProjectionController {
            component: component.clone(),
            services,
            registry: registry.clone(),
            element: deps.element,
            injector: deps.injector,
            bindings: Rc::new(RefCell::new(PropBag::new())),
            handle: UpdatableHandle::new(),
            remove: None,
            mounted: false,
        })
    })
}

struct ProjectionController {
    component: ComponentRef,
    services: BTreeMap<String, Service>,
    registry: PortalRegistry,
    element: SurfaceNode,
    injector: Injector,
    /// Live merged binding values; shared with the updatable wrapper so a
    /// late mount still starts from the latest batch.
    bindings: Rc<RefCell<PropBag>>,
    handle: UpdatableHandle,
    remove: Option<RemoveHandle>,
    mounted: bool,
}

impl ProjectionController {
    fn services_bag(&self) -> PropBag {
        self.services
            .iter()
            .map(|(name, service)| (name.clone(), PropValue::Service(service.clone())))
            .collect()
    }
}

impl Controller for ProjectionController {
    fn on_changes(&mut self, changes: &ChangeSet) {
        {
            let mut bag = self.bindings.borrow_mut();
            for (name, change) in changes.iter() {
                bag.set(name.to_string(), change.current.clone());
            }
        }
        if self.mounted {
            self.handle.update_props(self.bindings.borrow().clone());
        }
    }

    fn on_init(&mut self) {
        let element = updatable_element(
            self.component.clone(),
            Rc::clone(&self.bindings),
            self.services_bag(),
            self.handle.clone(),
        );
        self.remove = Some(self.registry.add_definition(ComponentDefinition {
            element,
            target: self.element.clone(),
            injector: self.injector.clone(),
        }));
        self.mounted = true;
    }

    fn on_destroy(&mut self) {
        if self.mounted
            && let Some(remove) = self.remove.take()
        {
            remove.remove();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use weft_scope::{ControllerDeps, LinkedComponent};
    use weft_tree::{SurfaceDecl, View, component};

    fn counter_component() -> ComponentRef {
        component("counter", |cx| {
            View::Surface(
                SurfaceDecl::new("counter")
                    .attr("count", cx.props().value("count").render_text()),
            )
        })
    }

    fn deps() -> ControllerDeps {
        ControllerDeps {
            element: SurfaceNode::new("host"),
            injector: Injector::new(),
        }
    }

    #[test]
    fn declares_one_way_bindings_per_prop() {
        let registry = PortalRegistry::new();
        let spec = tree_to_scope(counter_component(), &["count", "onPick"], &[], &registry);
        assert_eq!(spec.bindings.get("count").map(String::as_str), Some("<"));
        assert_eq!(spec.bindings.get("onPick").map(String::as_str), Some("<"));
        assert_eq!(spec.bindings.len(), 2);
    }

    #[test]
    fn init_registers_exactly_one_definition_against_the_element() {
        let registry = PortalRegistry::new();
        let spec = tree_to_scope(counter_component(), &["count"], &[], &registry);

        let mut initial = PropBag::new();
        initial.set("count", 5i64);
        let _linked = LinkedComponent::link(&spec, deps(), &initial);

        assert_eq!(registry.pending_len(), 1);
        assert_eq!(registry.registered_len(), 1);
    }

    #[test]
    fn destroy_deregisters() {
        let registry = PortalRegistry::new();
        let spec = tree_to_scope(counter_component(), &["count"], &[], &registry);

        let mut linked = LinkedComponent::link(&spec, deps(), &PropBag::new());
        assert_eq!(registry.registered_len(), 1);

        linked.destroy();
        assert_eq!(registry.registered_len(), 0);
        assert_eq!(registry.pending_len(), 0);
    }

    #[test]
    fn relink_same_element_replaces_definition() {
        let registry = PortalRegistry::new();
        let spec = tree_to_scope(counter_component(), &["count"], &[], &registry);

        let shared_element = SurfaceNode::new("host");
        let injector = Injector::new();
        let make_deps = || ControllerDeps {
            element: shared_element.clone(),
            injector: injector.clone(),
        };

        let _first = LinkedComponent::link(&spec, make_deps(), &PropBag::new());
        let _second = LinkedComponent::link(&spec, make_deps(), &PropBag::new());
        assert_eq!(registry.registered_len(), 1, "replaced, not duplicated");
    }

    #[test]
    fn missing_service_is_omitted_not_fatal() {
        let registry = PortalRegistry::new();
        let spec = tree_to_scope(
            counter_component(),
            &["count"],
            &["clock", "missing"],
            &registry,
        );

        let element = SurfaceNode::new("host");
        let injector = Injector::new();
        injector.register("clock", Rc::new(1u32));

        let _linked = LinkedComponent::link(
            &spec,
            ControllerDeps {
                element,
                injector,
            },
            &PropBag::new(),
        );
        assert_eq!(registry.registered_len(), 1);
    }
}
