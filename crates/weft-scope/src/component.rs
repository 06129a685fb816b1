#![forbid(unsafe_code)]

//! Component definitions and the controller lifecycle contract.
//!
//! A [`ComponentSpec`] pairs binding declarations with an optional
//! controller factory. [`LinkedComponent`] models the host framework's
//! linking contract that the bridge relies on:
//!
//! 1. The first change batch covers every declared binding and fires
//!    strictly before `on_init`.
//! 2. Subsequent updates fire `on_changes` with only the bindings whose
//!    values actually changed.
//! 3. `on_destroy` fires exactly once.
//!
//! Controllers receive their dependencies as a named record
//! ([`ControllerDeps`]) assembled by the host integration layer.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use weft_core::{PropBag, PropValue, SurfaceNode};

use crate::injector::Injector;

/// One changed binding.
#[derive(Clone, Debug, PartialEq)]
pub struct Change {
    /// Previous value; `None` on the first batch.
    pub previous: Option<PropValue>,
    pub current: PropValue,
    pub is_first: bool,
}

/// A batch of binding changes, keyed by binding name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChangeSet {
    changes: BTreeMap<String, Change>,
}

impl ChangeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, change: Change) {
        self.changes.insert(name.into(), change);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Change> {
        self.changes.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Change)> {
        self.changes.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Dependencies handed to a controller, by name rather than position.
#[derive(Clone, Debug)]
pub struct ControllerDeps {
    /// The host element the component was declared on.
    pub element: SurfaceNode,
    /// The capability injector of the surrounding container.
    pub injector: Injector,
}

/// Controller lifecycle hooks. All default to no-ops.
pub trait Controller {
    fn on_changes(&mut self, _changes: &ChangeSet) {}
    fn on_init(&mut self) {}
    fn on_destroy(&mut self) {}
}

type ControllerFactory = Rc<dyn Fn(ControllerDeps) -> Box<dyn Controller>>;

/// A component definition: binding declarations plus controller.
#[derive(Clone)]
pub struct ComponentSpec {
    /// Binding declarations, internal name -> declaration string.
    pub bindings: BTreeMap<String, String>,
    controller: Option<ControllerFactory>,
}

impl ComponentSpec {
    #[must_use]
    pub fn new(bindings: BTreeMap<String, String>) -> Self {
        Self {
            bindings,
            controller: None,
        }
    }

    /// Attach a controller factory.
    #[must_use]
    pub fn with_controller(
        mut self,
        factory: impl Fn(ControllerDeps) -> Box<dyn Controller> + 'static,
    ) -> Self {
        self.controller = Some(Rc::new(factory));
        self
    }

    /// Instantiate the controller, if the spec declares one.
    #[must_use]
    pub fn make_controller(&self, deps: ControllerDeps) -> Option<Box<dyn Controller>> {
        self.controller.as_ref().map(|factory| factory(deps))
    }
}

impl fmt::Debug for ComponentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentSpec")
            .field("bindings", &self.bindings)
            .field("has_controller", &self.controller.is_some())
            .finish()
    }
}

/// A linked component instance driving a controller through its lifecycle.
pub struct LinkedComponent {
    controller: Option<Box<dyn Controller>>,
    declared: Vec<String>,
    last: PropBag,
    destroyed: bool,
}

impl LinkedComponent {
    /// Link a spec: fire the first change batch (every declared binding),
    /// then `on_init`.
    #[must_use]
    pub fn link(spec: &ComponentSpec, deps: ControllerDeps, initial: &PropBag) -> Self {
        let declared: Vec<String> = spec.bindings.keys().cloned().collect();
        let mut controller = spec.make_controller(deps);

        let mut first = ChangeSet::new();
        let mut last = PropBag::new();
        for name in &declared {
            let current = initial.value(name);
            last.set(name.clone(), current.clone());
            first.insert(
                name.clone(),
                Change {
                    previous: None,
                    current,
                    is_first: true,
                },
            );
        }

        if let Some(c) = controller.as_mut() {
            if !first.is_empty() {
                c.on_changes(&first);
            }
            c.on_init();
        }

        Self {
            controller,
            declared,
            last,
            destroyed: false,
        }
    }

    /// Push a new binding bag; fires `on_changes` with changed bindings only.
    pub fn update(&mut self, bag: &PropBag) {
        if self.destroyed {
            return;
        }
        let mut changes = ChangeSet::new();
        for name in &self.declared {
            let current = bag.value(name);
            let previous = self.last.value(name);
            if current != previous {
                self.last.set(name.clone(), current.clone());
                changes.insert(
                    name.clone(),
                    Change {
                        previous: Some(previous),
                        current,
                        is_first: false,
                    },
                );
            }
        }
        if changes.is_empty() {
            return;
        }
        if let Some(c) = self.controller.as_mut() {
            c.on_changes(&changes);
        }
    }

    /// Fire `on_destroy` exactly once.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        if let Some(c) = self.controller.as_mut() {
            c.on_destroy();
        }
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

impl fmt::Debug for LinkedComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkedComponent")
            .field("declared", &self.declared)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Debug, PartialEq)]
    enum Event {
        Changes(Vec<(String, PropValue, bool)>),
        Init,
        Destroy,
    }

    struct Recorder {
        log: Rc<RefCell<Vec<Event>>>,
    }

    impl Controller for Recorder {
        fn on_changes(&mut self, changes: &ChangeSet) {
            let mut entries: Vec<(String, PropValue, bool)> = changes
                .iter()
                .map(|(name, ch)| (name.to_string(), ch.current.clone(), ch.is_first))
                .collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            self.log.borrow_mut().push(Event::Changes(entries));
        }

        fn on_init(&mut self) {
            self.log.borrow_mut().push(Event::Init);
        }

        fn on_destroy(&mut self) {
            self.log.borrow_mut().push(Event::Destroy);
        }
    }

    fn spec_with_recorder(log: &Rc<RefCell<Vec<Event>>>) -> ComponentSpec {
        let bindings: BTreeMap<String, String> = [("count", "<"), ("label", "<")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let log = Rc::clone(log);
        ComponentSpec::new(bindings)
            .with_controller(move |_deps| Box::new(Recorder { log: Rc::clone(&log) }))
    }

    fn deps() -> ControllerDeps {
        ControllerDeps {
            element: SurfaceNode::new("host"),
            injector: Injector::new(),
        }
    }

    #[test]
    fn first_changes_batch_precedes_init() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let spec = spec_with_recorder(&log);

        let mut initial = PropBag::new();
        initial.set("count", 5i64);

        let _linked = LinkedComponent::link(&spec, deps(), &initial);

        let log = log.borrow();
        assert_eq!(log.len(), 2);
        // Every declared binding appears in the first batch, absent ones as Null.
        assert_eq!(
            log[0],
            Event::Changes(vec![
                ("count".into(), PropValue::Int(5), true),
                ("label".into(), PropValue::Null, true),
            ])
        );
        assert_eq!(log[1], Event::Init);
    }

    #[test]
    fn update_fires_only_changed_bindings() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let spec = spec_with_recorder(&log);

        let mut initial = PropBag::new();
        initial.set("count", 5i64);
        initial.set("label", "a");
        let mut linked = LinkedComponent::link(&spec, deps(), &initial);
        log.borrow_mut().clear();

        let mut next = PropBag::new();
        next.set("count", 6i64);
        next.set("label", "a");
        linked.update(&next);

        assert_eq!(
            *log.borrow(),
            vec![Event::Changes(vec![(
                "count".into(),
                PropValue::Int(6),
                false
            )])]
        );
    }

    #[test]
    fn update_with_no_changes_is_silent() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let spec = spec_with_recorder(&log);

        let mut initial = PropBag::new();
        initial.set("count", 5i64);
        let mut linked = LinkedComponent::link(&spec, deps(), &initial);
        log.borrow_mut().clear();

        linked.update(&initial);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn destroy_fires_once() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let spec = spec_with_recorder(&log);

        let mut linked = LinkedComponent::link(&spec, deps(), &PropBag::new());
        log.borrow_mut().clear();

        linked.destroy();
        linked.destroy();
        assert_eq!(*log.borrow(), vec![Event::Destroy]);

        // Updates after destroy are ignored.
        let mut next = PropBag::new();
        next.set("count", 1i64);
        linked.update(&next);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn undeclared_props_never_reach_the_controller() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let spec = spec_with_recorder(&log);

        let mut initial = PropBag::new();
        initial.set("count", 1i64);
        initial.set("unrelated", 9i64);
        let mut linked = LinkedComponent::link(&spec, deps(), &initial);
        log.borrow_mut().clear();

        let mut next = PropBag::new();
        next.set("count", 1i64);
        next.set("unrelated", 10i64);
        linked.update(&next);
        assert!(log.borrow().is_empty());
    }
}
