//! Audit trail of best-effort decisions
//!
//! Fallbacks are policy, not swallowed errors: every reference left
//! untouched, every dropped inventory document and every shadowed mapping
//! is recorded here so operators can review them after a run.

use crate::identity::Identity;
use serde::Serialize;
use std::fmt::{self, Display, Formatter};

/// What kind of fallback was taken
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Reference had no in-bundle target and was kept as written
    UnresolvedReference {
        /// Field that holds the reference, e.g. `spec.scaleTargetRef.name`
        field: String,
        /// Identity the reference was looked up as
        target: Identity,
    },
    /// Inventory document was not a resource and was dropped
    DroppedInventory {
        /// Position within the bundle
        index: usize,
        /// Why it was dropped
        reason: String,
    },
    /// Two documents in a bundle shared an original identity; references
    /// resolve to the later one
    ShadowedIdentity {
        /// Original identity shared by both documents
        original: Identity,
        /// Canonical name that no longer receives references
        shadowed: String,
    },
}

/// One recorded fallback
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Document the fallback happened in, when there is one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<Identity>,
    /// Details
    #[serde(flatten)]
    pub kind: DiagnosticKind,
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(doc) = &self.document {
            write!(f, "{doc}: ")?;
        }
        match &self.kind {
            DiagnosticKind::UnresolvedReference { field, target } => {
                write!(f, "{field} -> {target} left unchanged")
            }
            DiagnosticKind::DroppedInventory { index, reason } => {
                write!(f, "inventory #{index} dropped: {reason}")
            }
            DiagnosticKind::ShadowedIdentity { original, shadowed } => {
                write!(f, "{original} maps past {shadowed}")
            }
        }
    }
}

/// Collector threaded through the rewriters
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create new empty collector
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fallback
    pub fn record(&mut self, document: Option<&Identity>, kind: DiagnosticKind) {
        let diagnostic = Diagnostic {
            document: document.cloned(),
            kind,
        };
        tracing::debug!(%diagnostic, "fallback");
        self.entries.push(diagnostic);
    }

    /// Recorded entries in order
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing was recorded
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume into entries
    #[inline]
    #[must_use]
    pub fn into_entries(self) -> Vec<Diagnostic> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_and_display() {
        let mut diags = Diagnostics::new();
        let doc = Identity::new("PersistentVolumeClaim", Some("gk-t"), "data");
        diags.record(
            Some(&doc),
            DiagnosticKind::UnresolvedReference {
                field: "spec.storageClassName".into(),
                target: Identity::new("StorageClass", None, "custom-sc"),
            },
        );

        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags.entries()[0].to_string(),
            "PersistentVolumeClaim/gk-t/data: spec.storageClassName -> StorageClass/custom-sc left unchanged"
        );
    }
}
