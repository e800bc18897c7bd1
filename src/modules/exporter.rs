//! Exporter
//!
//! Copies selected members of a definition into a destination scope. The
//! package author declares three conventions on the definition:
//!
//! - `EXPORT` - names exported when the caller asks for nothing in particular
//! - `EXPORT_OK` - names exported only when requested by name
//! - `EXPORT_TAGS` - tag names (conventionally `:all`, `:common`) that expand
//!   to a list of names
//!
//! An import request is a possibly nested list of tokens. Each flattened
//! token is matched, in order, first against `EXPORT` and `EXPORT_OK`, then
//! against the tag keys. Tokens that match neither are ignored.
//!
//! Copying never overwrites: a name already bound in the scope keeps its
//! value, which makes exporting idempotent and lets the first exporter of a
//! colliding name win.

use tracing::{debug, trace};

use super::namespace::Scope;
use super::path::{flatten, Nested};
use super::value::Definition;

fn in_list(list: Option<&[String]>, name: &str) -> bool {
    list.is_some_and(|names| names.iter().any(|n| n == name))
}

/// Compute the ordered list of names an import request selects.
///
/// An empty request selects the default export list. Duplicates are kept.
pub fn export_list(def: &Definition, request: &[Nested]) -> Vec<String> {
    if request.is_empty() {
        return def.export().map(<[String]>::to_vec).unwrap_or_default();
    }

    let mut names = Vec::new();
    for token in flatten(request) {
        if in_list(def.export(), &token) || in_list(def.export_ok(), &token) {
            names.push(token);
        } else if let Some(tagged) = def.tag(&token) {
            names.extend(tagged.iter().cloned());
        } else {
            trace!(target: "just::exporter", package = def.name(), %token, "Ignoring unknown import token");
        }
    }
    names
}

/// Export the members selected by `request` from `def` into `scope`.
///
/// Returns the names that were actually written.
pub fn export(def: &Definition, request: &[Nested], scope: &mut Scope) -> Vec<String> {
    let mut written = Vec::new();
    for name in export_list(def, request) {
        let Some(value) = def.member(&name) else {
            debug!(target: "just::exporter", package = def.name(), %name, "Exported name has no member");
            continue;
        };
        if scope.insert_if_absent(&name, value.clone()) {
            written.push(name);
        }
    }
    debug!(target: "just::exporter", package = def.name(), exported = written.len(), "Exported symbols");
    written
}
