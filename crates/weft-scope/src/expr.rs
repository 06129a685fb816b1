#![forbid(unsafe_code)]

//! Template expressions.
//!
//! The bridge only ever emits three expression shapes into templates:
//!
//! | shape                  | meaning                                  |
//! |------------------------|------------------------------------------|
//! | `props.name`           | read the prop                            |
//! | `{{props.name}}`       | read the prop, interpolate to text       |
//! | `props.name(a,b)`      | invoke the callback prop with locals a,b |
//!
//! Anything else parses as a literal string, the lenient behavior of plain
//! attribute text. Parsing is total; evaluation never fails - absent props
//! read as `Null` and non-callable invocation targets evaluate to `Null`
//! with a warning.

use weft_core::{PropBag, PropValue};

use crate::scope::Scope;

/// A parsed template expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// `props.<name>`
    Read(String),
    /// `{{props.<name>}}`
    Interpolate(String),
    /// `props.<name>(<params>)` - params are local names bound at call time.
    Call { name: String, params: Vec<String> },
    /// Anything that is not one of the shapes above.
    Literal(String),
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Expr {
    /// Parse a raw attribute string. Total: unknown shapes become
    /// [`Expr::Literal`].
    #[must_use]
    pub fn parse(src: &str) -> Self {
        let s = src.trim();

        if let Some(inner) = s.strip_prefix("{{").and_then(|r| r.strip_suffix("}}")) {
            let inner = inner.trim();
            if let Some(name) = inner.strip_prefix("props.")
                && is_ident(name)
            {
                return Self::Interpolate(name.to_string());
            }
            return Self::Literal(s.to_string());
        }

        if let Some(rest) = s.strip_prefix("props.") {
            if let Some(open) = rest.find('(')
                && rest.ends_with(')')
            {
                let name = &rest[..open];
                let inner = &rest[open + 1..rest.len() - 1];
                let params: Vec<String> = inner
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(String::from)
                    .collect();
                if is_ident(name) && params.iter().all(|p| is_ident(p)) {
                    return Self::Call {
                        name: name.to_string(),
                        params,
                    };
                }
            } else if is_ident(rest) {
                return Self::Read(rest.to_string());
            }
        }

        Self::Literal(s.to_string())
    }

    /// Evaluate against a scope, with optional named locals for callback
    /// parameters.
    #[must_use]
    pub fn eval(&self, scope: &Scope, locals: Option<&PropBag>) -> PropValue {
        match self {
            Self::Read(name) => scope.read_prop(name),
            Self::Interpolate(name) => PropValue::Str(scope.read_prop(name).render_text()),
            Self::Call { name, params } => {
                let args: Vec<PropValue> = params
                    .iter()
                    .map(|p| locals.map_or(PropValue::Null, |l| l.value(p)))
                    .collect();
                match scope.read_prop(name) {
                    PropValue::Fn(f) => f.call(&args),
                    PropValue::Null => PropValue::Null,
                    other => {
                        tracing::warn!(
                            target: "weft.scope",
                            prop = %name,
                            value = ?other,
                            "callback expression target is not callable"
                        );
                        PropValue::Null
                    }
                }
            }
            Self::Literal(text) => PropValue::Str(text.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
