#![forbid(unsafe_code)]

//! Binding-name case conversion.
//!
//! Scope-framework templates address bindings in dash-case
//! (`user-name="..."`), while prop bags and binding declarations use
//! camelCase (`userName`). Conversions here are total: any input produces
//! some output, and round-tripping a well-formed camelCase identifier
//! through dash-case is lossless.

/// Convert `dash-case` / `snake_case` / spaced words to `camelCase`.
#[must_use]
pub fn to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for ch in name.chars() {
        if ch == '-' || ch == '_' || ch == ' ' {
            upper_next = !out.is_empty();
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Convert `camelCase` to `dash-case`.
///
/// A run of consecutive uppercase letters is treated as one segment
/// (`innerHTML` becomes `inner-html`).
#[must_use]
pub fn to_dash(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for ch in name.chars() {
        if ch.is_uppercase() {
            if prev_lower {
                out.push('-');
            }
            out.extend(ch.to_lowercase());
            prev_lower = false;
        } else {
            out.push(ch);
            prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        }
    }
    out
}

/// Uppercase the first character (`userName` becomes `UserName`).
#[must_use]
pub fn to_pascal(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// The change-callback prop name for a two-way bound prop:
/// `userName` becomes `onUserNameChange`.
#[must_use]
pub fn change_callback_name(prop: &str) -> String {
    format!("on{}Change", to_pascal(prop))
}
