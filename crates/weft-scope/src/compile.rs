#![forbid(unsafe_code)]

//! One-time compilation of a surface node against a scope.
//!
//! For every raw attribute on the node:
//!
//! - expression attributes (`props.x`, `{{props.x}}`) get a retained
//!   watcher that materializes the evaluated value onto the node's
//!   resolved layer each digest;
//! - callback attributes (`props.x(a,b)`) get an invocable handler that
//!   evaluates the call with named locals at invocation time;
//! - literal attributes resolve immediately and never change.
//!
//! Compiling the same node twice duplicates watchers; callers compile a
//! node exactly once per scope (the bridge guards this with a per-instance
//! flag).

use std::rc::Rc;

use weft_core::{PropValue, SurfaceNode};

use crate::expr::Expr;
use crate::scope::Scope;

/// Bind a node's raw attributes to a scope.
pub fn compile(node: &SurfaceNode, scope: &Scope) {
    let attrs = node.raw_attrs();
    for (attr, raw) in attrs {
        let expr = Expr::parse(&raw);
        match expr {
            Expr::Call { .. } => {
                let scope = scope.clone();
                node.set_handler(
                    attr,
                    Rc::new(move |locals| expr.eval(&scope, Some(locals))),
                );
            }
            Expr::Literal(text) => {
                node.set_resolved(attr, PropValue::Str(text));
            }
            watchable => {
                let node = node.clone();
                let attr_name = attr.clone();
                scope.watch_retained(
                    move |s| watchable.eval(s, None),
                    move |new, _old| node.set_resolved(attr_name.clone(), new.clone()),
                );
            }
        }
    }
    tracing::debug!(
        target: "weft.scope",
        node = node.node_id(),
        tag = %node.tag(),
        scope = scope.scope_id(),
        "compiled surface node against scope"
    );
}
