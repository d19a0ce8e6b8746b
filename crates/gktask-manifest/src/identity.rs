//! Resource identities and the identity rewriter
//!
//! An [`Identity`] is the unit of uniqueness and of reference resolution.
//! [`stamp_identity`] writes a canonical identity and the provenance labels
//! into a document's metadata.

use crate::document::Document;
use crate::scope::{is_cluster_scoped, Scope};
use crate::verdict::Verdict;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::fmt::{self, Display, Formatter};

/// `(kind, namespace, name)` of a resource
///
/// The namespace is always `None` for cluster-scoped kinds, whatever the
/// caller passed in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identity {
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<String>,
    name: String,
}

impl Identity {
    /// Create identity, dropping the namespace of cluster-scoped kinds
    ///
    /// An empty namespace is treated as absent.
    #[must_use]
    pub fn new(kind: impl Into<String>, namespace: Option<&str>, name: impl Into<String>) -> Self {
        let kind = kind.into();
        let namespace = if is_cluster_scoped(&kind) {
            None
        } else {
            namespace.filter(|ns| !ns.is_empty()).map(str::to_string)
        };
        Self {
            kind,
            namespace,
            name: name.into(),
        }
    }

    /// Resource kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Namespace, `None` at cluster scope
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Resource name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Scope of the kind
    #[inline]
    #[must_use]
    pub fn scope(&self) -> Scope {
        Scope::of(&self.kind)
    }

    /// Same kind and namespace, different name
    #[must_use]
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            kind: self.kind.clone(),
            namespace: self.namespace.clone(),
            name: name.into(),
        }
    }
}

impl Display for Identity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}/{}", self.kind, ns, self.name),
            None => write!(f, "{}/{}", self.kind, self.name),
        }
    }
}

/// Provenance recorded on every rewritten document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance<'a> {
    /// Label key prefix, e.g. `k8s-ai-bench`
    pub label_prefix: &'a str,
    /// Owning task
    pub task_id: &'a str,
    /// Verdict expected of the bundle's subject
    pub expected: Verdict,
    /// Whether the document is an inventory dependency
    pub inventory: bool,
}

impl Provenance<'_> {
    /// Label key for `suffix`
    #[must_use]
    pub fn key(&self, suffix: &str) -> String {
        format!("{}/{}", self.label_prefix, suffix)
    }
}

/// Stamp `identity` and `provenance` into `doc`'s metadata
///
/// Sets `metadata.name`; sets `metadata.namespace` for namespaced kinds and
/// removes it for cluster-scoped ones; adds the `task`, `expected` and
/// `inventory` labels, keeping any other labels.
pub fn stamp_identity(doc: &mut Document, identity: &Identity, provenance: &Provenance<'_>) {
    let meta = doc.ensure_mapping(&["metadata"]);
    meta.insert(Value::from("name"), Value::from(identity.name()));
    match identity.namespace() {
        Some(ns) => {
            meta.insert(Value::from("namespace"), Value::from(ns));
        }
        None => {
            meta.remove("namespace");
        }
    }

    let labels = doc.ensure_mapping(&["metadata", "labels"]);
    labels.insert(
        Value::from(provenance.key("task")),
        Value::from(provenance.task_id),
    );
    labels.insert(
        Value::from(provenance.key("expected")),
        Value::from(provenance.expected.as_str()),
    );
    labels.insert(
        Value::from(provenance.key("inventory")),
        Value::from(provenance.inventory.to_string()),
    );
}
