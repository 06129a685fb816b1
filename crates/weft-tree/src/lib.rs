#![forbid(unsafe_code)]

//! Weft Tree
//!
//! A model of the declarative, tree-diffing host framework: components are
//! pure functions of props, re-rendered when their state changes, with an
//! effect mechanism for lifecycle-scoped side effects.
//!
//! # Key Components
//!
//! - [`Element`] - a cheap, clonable description of a component plus props.
//! - [`View`] - what a render returns: a surface, a child element, a keyed
//!   group, a context provider, or a portal.
//! - [`ViewCx`] - the hook context handed to renders (`use_state`,
//!   `use_ref`, `use_effect`, `context`).
//! - [`TreeRuntime`] - the headless mount/commit/effect loop. Renders are
//!   pure; all side effects run strictly after commit.
//!
//! # Role in Weft
//! `weft-tree` knows nothing about scopes or digests. `weft-bridge` mounts
//! bridged elements through [`TreeRuntime`] and leans on the post-commit
//! effect phase for everything that touches the other framework.

pub mod element;
pub mod runtime;

pub use element::{
    ComponentRef, ComponentType, Element, NodeRef, SurfaceDecl, View, component, memo_component,
};
pub use runtime::{Cleanup, Deps, MountHandle, StateSetter, TreeRuntime, ViewCx, cleanup};
