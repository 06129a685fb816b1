#![forbid(unsafe_code)]

//! Weft Scope
//!
//! A model of the scope-based host framework, covering exactly the surface
//! the bridge consumes:
//!
//! - [`Scope`] - hierarchical mutable state with watchers and explicit
//!   destruction.
//! - [`ScopeEnv`] - the digest cycle plus the deferred task queue that
//!   schedules work for the tick after the current one.
//! - [`Expr`] / [`compile`] - the template-expression shapes bridged
//!   components emit, and the one-time compile step that binds a surface
//!   node's attributes to a scope.
//! - [`Module`] - the registration queue binding declarations are recovered
//!   from.
//! - [`Injector`] - the named capability locator.
//! - [`ComponentSpec`] / [`Controller`] / [`LinkedComponent`] - component
//!   definitions and the controller lifecycle contract (the first change
//!   batch always precedes init).
//!
//! # Role in Weft
//! This crate knows nothing about elements, hooks, or portals; it is the
//! "legacy" half of the bridge. `weft-bridge` drives it from both sides.

pub mod compile;
pub mod component;
pub mod env;
pub mod expr;
pub mod injector;
pub mod module;
pub mod scope;

pub use compile::compile;
pub use component::{
    Change, ChangeSet, ComponentSpec, Controller, ControllerDeps, LinkedComponent,
};
pub use env::{DigestError, ScopeEnv};
pub use expr::Expr;
pub use injector::{InjectError, Injector};
pub use module::{DirectiveScope, DirectiveSpec, Module};
pub use scope::{Scope, WatchFn, WatchGuard};
