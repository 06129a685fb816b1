#![forbid(unsafe_code)]

//! Weft public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users. It
//! re-exports the common types from the internal crates and offers a
//! lightweight prelude for day-to-day usage.

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use weft_core::name;
pub use weft_core::{PropBag, PropFn, PropValue, Service, SurfaceNode, TwoWaySlot};

// --- Scope framework re-exports --------------------------------------------

pub use weft_scope::{
    Change, ChangeSet, ComponentSpec, Controller, ControllerDeps, DigestError, DirectiveScope,
    DirectiveSpec, Expr, InjectError, Injector, LinkedComponent, Module, Scope, ScopeEnv,
    WatchFn, WatchGuard, compile,
};

// --- Tree framework re-exports ---------------------------------------------

pub use weft_tree::{
    Cleanup, ComponentRef, ComponentType, Deps, Element, MountHandle, NodeRef, StateSetter,
    SurfaceDecl, TreeRuntime, View, ViewCx, cleanup, component, memo_component,
};

// --- Bridge re-exports -----------------------------------------------------

pub use weft_bridge::{
    BindingKind, BindingMetadata, ComponentDefinition, PortalEntry, PortalRegistry, RegistryError,
    RemoveHandle, UpdatableHandle, extract, injector_context, parse_binding, portal_renderer,
    scope_to_tree, settle, template_attrs, tree_to_scope, updatable_element, use_scope_watch,
    use_service,
};

// --- Errors ----------------------------------------------------------------

/// Top-level error type for bridge hosts.
#[derive(Debug)]
pub enum Error {
    /// The digest scheduler failed (unstable watchers or re-entry).
    Digest(DigestError),
    /// Portal registry misuse.
    Registry(RegistryError),
    /// Capability resolution failure.
    Inject(InjectError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Digest(err) => write!(f, "{err}"),
            Self::Registry(err) => write!(f, "{err}"),
            Self::Inject(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Digest(err) => Some(err),
            Self::Registry(err) => Some(err),
            Self::Inject(err) => Some(err),
        }
    }
}

impl From<DigestError> for Error {
    fn from(err: DigestError) -> Self {
        Self::Digest(err)
    }
}

impl From<RegistryError> for Error {
    fn from(err: RegistryError) -> Self {
        Self::Registry(err)
    }
}

impl From<InjectError> for Error {
    fn from(err: InjectError) -> Self {
        Self::Inject(err)
    }
}

/// Convenient imports for typical bridge hosts.
pub mod prelude {
    pub use crate::{
        Element, Injector, LinkedComponent, Module, PortalRegistry, PropBag, PropValue, ScopeEnv,
        SurfaceNode, TreeRuntime, portal_renderer, scope_to_tree, settle, tree_to_scope,
    };
}
