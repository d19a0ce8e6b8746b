//! Per-bundle rename table
//!
//! Maps an original identity to the canonical identity the allocator issued
//! for it. A document written with a namespace other than the task namespace
//! is also reachable under that source namespace, so references that spell
//! it out still resolve. One map per bundle: unrelated cases may reuse
//! original names.

use crate::identity::Identity;
use indexmap::IndexMap;

/// Original identity to canonical identity
#[derive(Debug, Default, Clone)]
pub struct NameMap {
    entries: IndexMap<Identity, Identity>,
}

impl NameMap {
    /// Create new empty map
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Map `(kind, namespace, original)` to `canonical` in the same scope
    ///
    /// Empty originals are ignored. Returns the canonical name previously
    /// mapped for the same identity, if any.
    pub fn set(
        &mut self,
        kind: &str,
        namespace: Option<&str>,
        original: &str,
        canonical: impl Into<String>,
    ) -> Option<String> {
        if original.is_empty() {
            return None;
        }
        let key = Identity::new(kind, namespace, original);
        let target = key.with_name(canonical.into());
        self.entries
            .insert(key, target)
            .map(|previous| previous.name().to_string())
    }

    /// Also map `original` in `source_namespace` to `canonical`
    ///
    /// Ignored for cluster-scoped kinds and when the source namespace is the
    /// canonical one. An existing entry for the same key wins.
    pub fn alias(&mut self, source_namespace: &str, original: &str, canonical: &Identity) {
        if original.is_empty() || canonical.namespace().map_or(true, |ns| ns == source_namespace) {
            return;
        }
        let key = Identity::new(canonical.kind(), Some(source_namespace), original);
        self.entries.entry(key).or_insert_with(|| canonical.clone());
    }

    /// Canonical identity for `(kind, namespace, name)`, if mapped
    #[must_use]
    pub fn canonical(&self, kind: &str, namespace: Option<&str>, name: &str) -> Option<&Identity> {
        if name.is_empty() {
            return None;
        }
        self.entries.get(&Identity::new(kind, namespace, name))
    }

    /// Canonical name for `(kind, namespace, name)`, if mapped
    #[must_use]
    pub fn lookup(&self, kind: &str, namespace: Option<&str>, name: &str) -> Option<&str> {
        self.canonical(kind, namespace, name).map(Identity::name)
    }

    /// Canonical name for `(kind, namespace, name)`, or `name` unchanged
    #[must_use]
    pub fn resolve<'a>(&'a self, kind: &str, namespace: Option<&str>, name: &'a str) -> &'a str {
        self.lookup(kind, namespace, name).unwrap_or(name)
    }

    /// Number of mappings
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the map is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
