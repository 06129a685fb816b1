#![forbid(unsafe_code)]

//! Weft Bridge
//!
//! The bidirectional bridge between the scope framework (`weft-scope`) and
//! the tree framework (`weft-tree`):
//!
//! - [`scope_to_tree`] - use a scope-framework component inside the tree
//!   framework, with binding metadata recovered from the module queue and
//!   two-way bindings surfaced as `on<Name>Change` props.
//! - [`tree_to_scope`] - use a tree component inside the scope framework,
//!   as a component definition whose controller defers actual mounting to
//!   the portal registry.
//! - [`PortalRegistry`] / [`portal_renderer`] - the queue/cache of pending
//!   projections and the single component that materializes them.
//! - [`UpdatableHandle`] - imperative prop replacement for a mounted
//!   projection.
//! - [`use_service`] / [`use_scope_watch`] - leaf hooks for bridged
//!   components.
//!
//! # How the two schedulers meet
//! Each framework keeps its own update cycle; the bridge never runs one
//! inside the other. Tree-side work happens in post-commit effects; scope-
//! side work is scheduled onto the digest queue. [`settle`] drives both to
//! quiescence, which is what a host's event loop does in production and
//! what tests do explicitly.

pub mod hooks;
pub mod metadata;
pub mod registry;
pub mod renderer;
pub mod scope_to_tree;
pub mod tree_to_scope;
pub mod updatable;

pub use hooks::{injector_context, use_scope_watch, use_service};
pub use metadata::{BindingKind, BindingMetadata, extract, parse_binding, template_attrs};
pub use registry::{
    ComponentDefinition, PortalEntry, PortalRegistry, RegistryError, RegistryOp, RemoveHandle,
    RendererSubscription,
};
pub use renderer::portal_renderer;
pub use scope_to_tree::scope_to_tree;
pub use tree_to_scope::tree_to_scope;
pub use updatable::{UpdatableHandle, updatable_element};

use weft_scope::{DigestError, ScopeEnv};
use weft_tree::TreeRuntime;

/// Upper bound on settle iterations; a bridge that keeps generating work
/// past this is cycling between the two schedulers.
const SETTLE_TTL: u32 = 64;

/// Drive both schedulers until neither has pending work.
///
/// Alternates tree flushes with scope ticks; each side may hand work to
/// the other (a digest can push props into components, a commit can
/// schedule a digest), so the loop runs until a full round is quiet.
pub fn settle(runtime: &TreeRuntime, env: &ScopeEnv) -> Result<(), DigestError> {
    for _ in 0..SETTLE_TTL {
        let tree_work = runtime.flush();
        let scope_work = env.tick()?;
        if !tree_work && !scope_work {
            return Ok(());
        }
    }
    Err(DigestError::Unstable { passes: SETTLE_TTL })
}
