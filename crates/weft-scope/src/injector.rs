#![forbid(unsafe_code)]

//! Named capability lookup.
//!
//! The injector is a flat service locator: instances registered under
//! string keys, resolved by name. Bridged components carry a handle to the
//! injector of the container they originated from, so capability lookups
//! stay scoped to the right host even when the component is projected
//! elsewhere.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use weft_core::Service;

/// Resolution failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectError {
    /// No service registered under the requested name.
    UnknownService(String),
}

impl fmt::Display for InjectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownService(name) => write!(f, "unknown service: {name}"),
        }
    }
}

impl std::error::Error for InjectError {}

/// Shared handle to a capability injector.
#[derive(Clone)]
pub struct Injector {
    services: Rc<RefCell<AHashMap<String, Service>>>,
}

impl Injector {
    #[must_use]
    pub fn new() -> Self {
        Self {
            services: Rc::new(RefCell::new(AHashMap::new())),
        }
    }

    /// Register an instance under a name. Re-registering replaces.
    pub fn register(&self, name: impl Into<String>, object: Rc<dyn Any>) {
        let name = name.into();
        let service = Service::new(name.clone(), object);
        self.services.borrow_mut().insert(name, service);
    }

    /// Resolve a service by name.
    pub fn get(&self, name: &str) -> Result<Service, InjectError> {
        self.services
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| InjectError::UnknownService(name.to_string()))
    }

    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.services.borrow().contains_key(name)
    }

    /// Pointer identity with another handle.
    #[must_use]
    pub fn same_injector(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.services, &other.services)
    }
}

impl Default for Injector {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Injector {
    fn eq(&self, other: &Self) -> bool {
        self.same_injector(other)
    }
}

impl fmt::Debug for Injector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injector")
            .field("services", &self.services.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_resolve() {
        let injector = Injector::new();
        injector.register("clock", Rc::new("tick".to_string()));

        let service = injector.get("clock").unwrap();
        assert_eq!(service.name(), "clock");
        assert_eq!(service.downcast::<String>().as_deref(), Some(&"tick".to_string()));
    }

    #[test]
    fn unknown_service_is_an_error() {
        let injector = Injector::new();
        assert_eq!(
            injector.get("nope"),
            Err(InjectError::UnknownService("nope".into()))
        );
    }

    #[test]
    fn reregistration_replaces() {
        let injector = Injector::new();
        injector.register("n", Rc::new(1u32));
        injector.register("n", Rc::new(2u32));
        let service = injector.get("n").unwrap();
        assert_eq!(service.downcast::<u32>().as_deref(), Some(&2));
    }

    #[test]
    fn handle_identity() {
        let a = Injector::new();
        let b = a.clone();
        let c = Injector::new();
        assert!(a.same_injector(&b));
        assert!(!a.same_injector(&c));
    }
}
