#![forbid(unsafe_code)]

//! Leaf hooks for bridged components.
//!
//! # Failure Modes
//!
//! - [`use_service`] called with no injector provider in context is a hard,
//!   immediate failure (panic). This is the one bridge error that must
//!   surface loudly: it means the portal renderer (or another provider) is
//!   missing from the setup, and every capability lookup would silently
//!   misbehave otherwise. An unknown service name fails the same way, as
//!   the injector would in its home framework.

use weft_core::{PropValue, Service};
use weft_scope::{Injector, ScopeEnv, WatchFn};
use weft_tree::{Cleanup, Deps, ViewCx};

/// The enclosing capability injector, if a provider is in context.
#[must_use]
pub fn injector_context(cx: &ViewCx<'_>) -> Option<Injector> {
    cx.context::<Injector>()
}

/// Resolve a named service through the enclosing injector provider.
///
/// # Panics
///
/// Panics when no injector provider encloses the calling component, or
/// when the service name is unknown to the injector.
#[must_use]
pub fn use_service(cx: &mut ViewCx<'_>, name: &str) -> Service {
    let injector = injector_context(cx).unwrap_or_else(|| {
        panic!("capability accessor used without an enclosing injector provider")
    });
    match injector.get(name) {
        Ok(service) => service,
        Err(err) => panic!("{err}"),
    }
}

/// Subscribe watch expressions to the digest cycle and return their latest
/// values as an ordered tuple.
///
/// The group is re-subscribed whenever the watch list changes (keyed on its
/// length); each member is evaluated against the root scope on every
/// digest, so cheap value-shaped watch functions are recommended.
#[must_use]
pub fn use_scope_watch(
    cx: &mut ViewCx<'_>,
    env: &ScopeEnv,
    watch_fns: Vec<WatchFn>,
) -> Vec<PropValue> {
    let root = env.root();

    let init_root = root.clone();
    let init_fns = watch_fns.clone();
    let (values, set_values) =
        cx.use_state(move || init_fns.iter().map(|f| f(&init_root)).collect::<Vec<_>>());

    let key = PropValue::Int(watch_fns.len() as i64);
    cx.use_effect(Deps::Keyed(vec![key]), move || -> Cleanup {
        let guard = root.watch_group(watch_fns, move |latest| set_values.set(latest.to_vec()));
        Some(Box::new(move || drop(guard)))
    });

    values
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
