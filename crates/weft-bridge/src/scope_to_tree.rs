#![forbid(unsafe_code)]

//! Wrapping a scope-framework component for use in the tree framework.
//!
//! # How it works
//!
//! The wrapped component renders a single surface named after the
//! component, carrying one template-expression attribute per declared
//! binding. Per instance:
//!
//! - a mount effect creates a bridge scope as a child of the environment's
//!   root scope; the teardown destroys it, deferred by one scheduler tick
//!   when a digest is in flight so the scope tree is never mutated
//!   mid-traversal;
//! - an every-render effect pushes the current props into `scope.props`
//!   (two-way bindings become [`TwoWaySlot`]s whose reads return the
//!   current prop value and whose writes invoke the matching
//!   `on<Name>Change` prop), compiles the committed surface against the
//!   scope exactly once, and unconditionally schedules a digest.
//!
//! Binding metadata and the template attribute map are resolved from the
//! module's registration queue on the first render of any instance and
//! shared by all instances of the wrapped component. The component is
//! memoized: re-renders happen only when props change, which is what keeps
//! the every-render effect from doing redundant work.

use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use weft_core::name::{change_callback_name, to_camel, to_dash};
use weft_core::{PropValue, TwoWaySlot};
use weft_scope::{Module, ScopeEnv, Scope, compile};
use weft_tree::{Cleanup, ComponentRef, Deps, NodeRef, SurfaceDecl, View, memo_component};

use crate::metadata::{BindingMetadata, extract, template_attrs};

struct SharedMeta {
    metadata: Vec<BindingMetadata>,
    attrs: BTreeMap<String, String>,
}

/// Wrap the named scope-framework component (or directive) as a tree
/// component.
///
/// `callback_params` maps each callback binding's external name to its
/// declared parameter names, in the order the scope side supplies them.
#[must_use]
pub fn scope_to_tree(
    component_name: &str,
    module: &Module,
    callback_params: &BTreeMap<String, Vec<String>>,
    env: &ScopeEnv,
) -> ComponentRef {
    let normalized = to_camel(component_name);
    let tag = to_dash(&normalized);
    let module = module.clone();
    let env = env.clone();
    let callback_params = callback_params.clone();
    // Resolved lazily on first render, shared across instances: the
    // component may be wrapped before the module finishes registering.
    let shared: Rc<OnceCell<Rc<SharedMeta>>> = Rc::new(OnceCell::new());

    memo_component(normalized.clone(), move |cx| {
        let meta = Rc::clone(shared.get_or_init(|| {
            let bindings = module.bindings_of(&normalized, &env.injector());
            let metadata = extract(&bindings, &callback_params);
            let attrs = template_attrs(&metadata);
            tracing::debug!(
                target: "weft.bridge",
                component = %normalized,
                bindings = metadata.len(),
                "resolved binding metadata"
            );
            Rc::new(SharedMeta { metadata, attrs })
        }));

        let (scope, set_scope) = cx.use_state(|| Option::<Scope>::None);
        let node_ref = cx.use_ref(NodeRef::new).borrow().clone();
        let compiled = cx.use_ref(|| false);

        // Scope lifecycle: created on mount, destroyed on unmount - but
        // never synchronously inside an active digest.
        {
            let env = env.clone();
            let set_scope = set_scope.clone();
            cx.use_effect(Deps::Once, move || -> Cleanup {
                let scope = env.new_child_scope();
                set_scope.set(Some(scope.clone()));
                Some(Box::new(move || {
                    if env.in_digest() {
                        tracing::debug!(
                            target: "weft.bridge",
                            scope = scope.scope_id(),
                            "digest in flight; deferring scope destruction"
                        );
                        let scope = scope.clone();
                        env.schedule(move || scope.destroy());
                    } else {
                        scope.destroy();
                    }
                }))
            });
        }

        // Prop push + one-time compile + digest, after every commit.
        {
            let env = env.clone();
            let meta = Rc::clone(&meta);
            let props = cx.props().clone();
            let scope = scope.clone();
            let node_ref = node_ref.clone();
            let compiled = Rc::clone(&compiled);
            cx.use_effect(Deps::Always, move || -> Cleanup {
                let Some(scope) = scope else {
                    return None;
                };

                let mut bag = props.clone();
                for binding in meta.metadata.iter().filter(|m| m.is_two_way()) {
                    let read_props = props.clone();
                    let read_name = binding.prop_name.clone();
                    let on_change = props.value(&change_callback_name(&binding.prop_name));
                    let slot = TwoWaySlot::new(
                        move || read_props.value(&read_name),
                        move |value| {
                            if let PropValue::Fn(callback) = &on_change {
                                let _ = callback.call(&[value]);
                            }
                        },
                    );
                    bag.set(binding.prop_name.clone(), PropValue::Slot(slot));
                }
                scope.set_props(bag);

                if !*compiled.borrow()
                    && let Some(node) = node_ref.get()
                {
                    compile(&node, &scope);
                    *compiled.borrow_mut() = true;
                }

                env.schedule_digest();
                None
            });
        }

        View::Surface(
            SurfaceDecl::new(tag.clone())
                .attrs(meta.attrs.clone())
                .with_ref(node_ref),
        )
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
