//! Scope classification
//!
//! Decides whether a resource kind lives at cluster scope (identity is
//! global) or inside a namespace (identity is qualified by namespace).

/// Kinds whose identity carries no namespace
///
/// Sorted, so lookup is a binary search.
pub const CLUSTER_SCOPED_KINDS: &[&str] = &[
    "APIService",
    "CSIDriver",
    "CSINode",
    "ClusterRole",
    "ClusterRoleBinding",
    "CustomResourceDefinition",
    "FlowSchema",
    "MutatingWebhookConfiguration",
    "Namespace",
    "Node",
    "PersistentVolume",
    "PodSecurityPolicy",
    "PriorityClass",
    "RuntimeClass",
    "StorageClass",
    "ValidatingWebhookConfiguration",
    "VolumeAttachment",
];

/// Resolution scope of a kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Identity is global
    Cluster,
    /// Identity is qualified by namespace
    Namespaced,
}

impl Scope {
    /// Scope of `kind`
    ///
    /// Unknown kinds are namespaced.
    #[inline]
    #[must_use]
    pub fn of(kind: &str) -> Self {
        if is_cluster_scoped(kind) {
            Self::Cluster
        } else {
            Self::Namespaced
        }
    }

    /// Display label used in reports
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cluster => "cluster",
            Self::Namespaced => "namespaced",
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check whether `kind` is cluster-scoped
#[inline]
#[must_use]
pub fn is_cluster_scoped(kind: &str) -> bool {
    CLUSTER_SCOPED_KINDS.binary_search(&kind).is_ok()
}
