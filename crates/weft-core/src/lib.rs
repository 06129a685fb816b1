#![forbid(unsafe_code)]

//! Weft Core
//!
//! Shared building blocks for both halves of the bridge:
//!
//! - [`PropValue`] / [`PropBag`] - the dynamic value model that crosses the
//!   framework boundary in both directions.
//! - [`TwoWaySlot`] - an explicit read/write descriptor for two-way bound
//!   values, passed as a plain value object.
//! - [`SurfaceNode`] - the DOM-like render target that scope-framework
//!   templates compile against and tree-framework output commits into.
//! - [`name`] - binding-name case conversion helpers.
//!
//! # Role in Weft
//! `weft-core` is deliberately framework-agnostic: it knows nothing about
//! scopes, digests, elements, or effects. Both `weft-scope` and `weft-tree`
//! depend on it; nothing here depends on them.

pub mod name;
pub mod surface;
pub mod value;

pub use surface::SurfaceNode;
pub use value::{PropBag, PropFn, PropValue, Service, TwoWaySlot};
