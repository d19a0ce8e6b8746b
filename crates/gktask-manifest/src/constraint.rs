//! Policy constraint scoping
//!
//! Constraints in the source library often restrict themselves to named
//! namespaces. Task resources all live in the isolated task namespace, so
//! those restrictions are removed before the constraint ships with a task.

use crate::document::Document;

/// Remove `spec.match.namespaces` and `spec.match.excludedNamespaces`
///
/// Returns whether anything was removed.
pub fn strip_namespace_match(doc: &mut Document) -> bool {
    let mut removed = false;
    for key in ["namespaces", "excludedNamespaces"] {
        removed |= doc.remove_path(&["spec", "match", key]).is_some();
    }
    removed
}

/// Constraint kind, which names the template it instantiates
#[must_use]
pub fn kind_of(doc: &Document) -> Option<&str> {
    doc.kind()
}
