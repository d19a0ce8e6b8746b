//! Run-wide name allocation
//!
//! Provides [`NameAllocator`], the registry of every canonical name issued
//! during one generation run. It is an explicit value owned by the caller,
//! never global state, so tests build an isolated one each.

use crate::error::AllocationError;
use crate::identity::Identity;
use std::collections::HashSet;

/// Result of a successful allocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    /// Reserved name
    pub name: String,
    /// Whether a `-N` suffix had to be added to the base name
    pub renamed: bool,
}

/// Registry of issued `(kind, namespace, name)` tuples
#[derive(Debug, Default, Clone)]
pub struct NameAllocator {
    issued: HashSet<Identity>,
}

impl NameAllocator {
    /// Create new empty allocator
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            issued: HashSet::new(),
        }
    }

    /// Reserve `base`, or the first free `base-2`, `base-3`, ...
    ///
    /// The namespace is ignored for cluster-scoped kinds.
    ///
    /// # Errors
    /// Returns [`AllocationError::EmptyBaseName`] if `base` is empty
    pub fn allocate(
        &mut self,
        kind: &str,
        namespace: Option<&str>,
        base: &str,
    ) -> Result<Allocation, AllocationError> {
        if base.is_empty() {
            return Err(AllocationError::EmptyBaseName {
                kind: kind.to_string(),
            });
        }

        let key = Identity::new(kind, namespace, base);
        if self.issued.insert(key.clone()) {
            return Ok(Allocation {
                name: base.to_string(),
                renamed: false,
            });
        }

        let mut suffix = 2u64;
        let name = loop {
            let candidate = format!("{base}-{suffix}");
            if self.issued.insert(key.with_name(candidate.as_str())) {
                break candidate;
            }
            suffix += 1;
        };
        tracing::debug!(%key, renamed = %name, "name collision resolved");
        Ok(Allocation {
            name,
            renamed: true,
        })
    }

    /// Reserve exactly `name`, without suffixing
    ///
    /// Returns `false` (and reserves nothing) if it was already issued.
    ///
    /// # Errors
    /// Returns [`AllocationError::EmptyBaseName`] if `name` is empty
    pub fn reserve_exact(
        &mut self,
        kind: &str,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<bool, AllocationError> {
        if name.is_empty() {
            return Err(AllocationError::EmptyBaseName {
                kind: kind.to_string(),
            });
        }
        Ok(self.issued.insert(Identity::new(kind, namespace, name)))
    }

    /// Check whether an identity has been issued
    #[inline]
    #[must_use]
    pub fn is_issued(&self, kind: &str, namespace: Option<&str>, name: &str) -> bool {
        self.issued.contains(&Identity::new(kind, namespace, name))
    }

    /// Number of issued names
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.issued.len()
    }

    /// Check if nothing has been issued
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issued.is_empty()
    }
}
