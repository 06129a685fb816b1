#![forbid(unsafe_code)]

//! Module registration queues.
//!
//! Component and directive registrations are queued in declaration order
//! and only ever read back, never executed: the bridge recovers a named
//! component's binding declarations from the queue with
//! [`Module::bindings_of`]. Binding declarations are treated as immutable
//! once the module has finished registering components.
//!
//! An unknown name resolves to an empty binding set. That keeps a
//! misconfigured host rendering (nothing gets wired) instead of failing
//! hard; the lookup emits a warning so the misconfiguration is observable.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::component::ComponentSpec;
use crate::injector::Injector;

/// How a directive binds its scope.
#[derive(Clone, Debug, PartialEq)]
pub enum DirectiveScope {
    /// Shares the surrounding scope.
    Shared,
    /// A fresh child scope, no isolate bindings.
    Child,
    /// An isolate scope with its own binding declarations.
    Isolate(BTreeMap<String, String>),
}

/// A directive definition, as far as the bridge cares about one.
#[derive(Clone, Debug)]
pub struct DirectiveSpec {
    pub scope: DirectiveScope,
    /// When present (and the scope is isolate), wins over the scope map.
    pub bind_to_controller: Option<BTreeMap<String, String>>,
}

/// Factory invoked through the injector to obtain a directive definition.
pub type DirectiveFactory = Rc<dyn Fn(&Injector) -> DirectiveSpec>;

enum Registration {
    Component { name: String, spec: ComponentSpec },
    Directive { name: String, factory: DirectiveFactory },
}

struct ModuleInner {
    name: String,
    queue: Vec<Registration>,
}

/// Shared handle to a module and its registration queue.
#[derive(Clone)]
pub struct Module {
    inner: Rc<RefCell<ModuleInner>>,
}

impl Module {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ModuleInner {
                name: name.into(),
                queue: Vec::new(),
            })),
        }
    }

    #[must_use]
    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    /// Queue a component registration.
    pub fn component(&self, name: impl Into<String>, spec: ComponentSpec) -> &Self {
        self.inner.borrow_mut().queue.push(Registration::Component {
            name: name.into(),
            spec,
        });
        self
    }

    /// Queue a directive registration.
    pub fn directive(
        &self,
        name: impl Into<String>,
        factory: impl Fn(&Injector) -> DirectiveSpec + 'static,
    ) -> &Self {
        self.inner.borrow_mut().queue.push(Registration::Directive {
            name: name.into(),
            factory: Rc::new(factory),
        });
        self
    }

    /// Look up a registered component's spec by normalized name.
    #[must_use]
    pub fn component_spec(&self, name: &str) -> Option<ComponentSpec> {
        let inner = self.inner.borrow();
        inner.queue.iter().find_map(|reg| match reg {
            Registration::Component { name: n, spec } if n == name => Some(spec.clone()),
            _ => None,
        })
    }

    /// Recover the binding declarations of a named component or directive.
    ///
    /// Components are consulted first. For directives the factory is
    /// invoked through the injector; only an isolate scope carries
    /// bindings, with `bind_to_controller` taking precedence. An unknown
    /// name degrades to an empty binding set with a warning.
    #[must_use]
    pub fn bindings_of(&self, name: &str, injector: &Injector) -> BTreeMap<String, String> {
        if let Some(spec) = self.component_spec(name) {
            return spec.bindings.clone();
        }

        let factory = {
            let inner = self.inner.borrow();
            inner.queue.iter().find_map(|reg| match reg {
                Registration::Directive { name: n, factory } if n == name => {
                    Some(Rc::clone(factory))
                }
                _ => None,
            })
        };
        if let Some(factory) = factory {
            let directive = factory(injector);
            if let DirectiveScope::Isolate(scope_map) = directive.scope {
                return directive.bind_to_controller.unwrap_or(scope_map);
            }
            return BTreeMap::new();
        }

        tracing::warn!(
            target: "weft.scope",
            module = %self.name(),
            component = %name,
            "no component or directive registered under this name; \
             resolving to an empty binding set"
        );
        BTreeMap::new()
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Module")
            .field("name", &inner.name)
            .field("registrations", &inner.queue.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bindings(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn component_bindings_are_recovered() {
        let module = Module::new("app");
        module.component(
            "userCard",
            ComponentSpec::new(bindings(&[("name", "<"), ("onSave", "&")])),
        );

        let injector = Injector::new();
        assert_eq!(
            module.bindings_of("userCard", &injector),
            bindings(&[("name", "<"), ("onSave", "&")])
        );
    }

    #[test]
    fn directive_isolate_scope_bindings() {
        let module = Module::new("app");
        module.directive("legacyGrid", |_| DirectiveSpec {
            scope: DirectiveScope::Isolate(bindings(&[("rows", "<")])),
            bind_to_controller: None,
        });

        let injector = Injector::new();
        assert_eq!(
            module.bindings_of("legacyGrid", &injector),
            bindings(&[("rows", "<")])
        );
    }

    #[test]
    fn bind_to_controller_wins_over_scope_map() {
        let module = Module::new("app");
        module.directive("legacyGrid", |_| DirectiveSpec {
            scope: DirectiveScope::Isolate(bindings(&[("rows", "<")])),
            bind_to_controller: Some(bindings(&[("rows", "<"), ("onPick", "&")])),
        });

        let injector = Injector::new();
        assert_eq!(
            module.bindings_of("legacyGrid", &injector),
            bindings(&[("rows", "<"), ("onPick", "&")])
        );
    }

    #[test]
    fn boolean_scope_directive_has_no_bindings() {
        let module = Module::new("app");
        module.directive("plain", |_| DirectiveSpec {
            scope: DirectiveScope::Shared,
            bind_to_controller: Some(bindings(&[("ignored", "<")])),
        });

        let injector = Injector::new();
        assert!(module.bindings_of("plain", &injector).is_empty());
    }

    #[test]
    fn unknown_name_degrades_to_empty() {
        let module = Module::new("app");
        let injector = Injector::new();
        assert!(module.bindings_of("ghost", &injector).is_empty());
    }

    #[test]
    fn components_are_consulted_before_directives() {
        let module = Module::new("app");
        module.directive("thing", |_| DirectiveSpec {
            scope: DirectiveScope::Isolate(bindings(&[("fromDirective", "<")])),
            bind_to_controller: None,
        });
        module.component("thing", ComponentSpec::new(bindings(&[("fromComponent", "<")])));

        let injector = Injector::new();
        assert_eq!(
            module.bindings_of("thing", &injector),
            bindings(&[("fromComponent", "<")])
        );
    }
}
