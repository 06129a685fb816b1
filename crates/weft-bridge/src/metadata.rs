#![forbid(unsafe_code)]

//! Binding-declaration metadata.
//!
//! A binding declaration is a short string whose first character selects
//! the binding kind and whose remaining characters, if any, override the
//! external prop name:
//!
//! | first char | kind       | template expression               |
//! |------------|------------|-----------------------------------|
//! | `<`        | one-way    | `props.<name>`                    |
//! | `@`        | text       | `{{props.<name>}}`                |
//! | `&`        | callback   | `props.<name>(<param,param,..>)`  |
//! | `=`        | two-way    | `props.<name>`                    |
//!
//! An unknown first character leaves the kind unset and falls back to the
//! one-way expression shape; this is deliberate leniency, not validation.
//! Callback parameter names come from the caller-supplied map; a callback
//! with no declared parameters gets an empty argument list and can only be
//! invoked with no data.
//!
//! Metadata is computed once per wrapped component and reused for every
//! instance (binding declarations are immutable once a module finishes
//! registering).

use std::collections::BTreeMap;

use weft_core::name::to_dash;

/// Binding direction/kind, selected by the declaration's first character.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingKind {
    /// `<` - value flows into the component.
    OneWay,
    /// `@` - string-interpolated value.
    Text,
    /// `&` - callback into the owner.
    Callback,
    /// `=` - readable and writable binding.
    TwoWay,
}

impl BindingKind {
    /// Map a declaration character; unknown characters map to `None`.
    #[must_use]
    pub fn from_decl_char(c: char) -> Option<Self> {
        match c {
            '<' => Some(Self::OneWay),
            '@' => Some(Self::Text),
            '&' => Some(Self::Callback),
            '=' => Some(Self::TwoWay),
            _ => None,
        }
    }
}

/// Normalized metadata for one declared binding.
#[derive(Clone, Debug, PartialEq)]
pub struct BindingMetadata {
    /// External prop name (declaration override, else the internal name).
    pub prop_name: String,
    /// `None` for unrecognized declaration characters.
    pub kind: Option<BindingKind>,
    /// The expression injected into the template for this binding.
    pub template_expression: String,
}

impl BindingMetadata {
    #[must_use]
    pub fn is_two_way(&self) -> bool {
        self.kind == Some(BindingKind::TwoWay)
    }
}

/// Split a declaration string into kind and external name.
///
/// The first character is always consumed as the kind selector; whatever
/// follows is the external name override.
#[must_use]
pub fn parse_binding(internal_name: &str, declaration: &str) -> (Option<BindingKind>, String) {
    let mut chars = declaration.chars();
    let kind = chars.next().and_then(BindingKind::from_decl_char);
    let rest: String = chars.collect();
    let prop_name = if rest.is_empty() {
        internal_name.to_string()
    } else {
        rest
    };
    (kind, prop_name)
}

/// Compute metadata for a full binding-declaration map.
#[must_use]
pub fn extract(
    bindings: &BTreeMap<String, String>,
    callback_params: &BTreeMap<String, Vec<String>>,
) -> Vec<BindingMetadata> {
    bindings
        .iter()
        .map(|(internal, declaration)| {
            let (kind, prop_name) = parse_binding(internal, declaration);
            let template_expression = match kind {
                Some(BindingKind::Text) => format!("{{{{props.{prop_name}}}}}"),
                Some(BindingKind::Callback) => {
                    let params = callback_params
                        .get(&prop_name)
                        .map(|names| names.join(","))
                        .unwrap_or_default();
                    format!("props.{prop_name}({params})")
                }
                _ => format!("props.{prop_name}"),
            };
            BindingMetadata {
                prop_name,
                kind,
                template_expression,
            }
        })
        .collect()
}

/// Derive the template attribute map: dash-cased external name to
/// template expression.
#[must_use]
pub fn template_attrs(metadata: &[BindingMetadata]) -> BTreeMap<String, String> {
    metadata
        .iter()
        .map(|m| (to_dash(&m.prop_name), m.template_expression.clone()))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
