//! Closed set of kinds the rewriter understands
//!
//! Every kind-specific mutation dispatches on [`ResourceKind`]; anything
//! outside the set is [`ResourceKind::Other`] and is left alone.

/// Kinds with reference or deployability rules
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Autoscaler pointing at a workload
    HorizontalPodAutoscaler,
    /// Volume claim
    PersistentVolumeClaim,
    /// Stateful workload
    StatefulSet,
    /// Deployment workload
    Deployment,
    /// Replica set workload
    ReplicaSet,
    /// Daemon set workload
    DaemonSet,
    /// Run-to-completion workload
    Job,
    /// Scheduled job workload
    CronJob,
    /// Bare pod
    Pod,
    /// Namespaced role binding
    RoleBinding,
    /// Cluster-wide role binding
    ClusterRoleBinding,
    /// Anything else
    Other(String),
}

/// Where a kind keeps its pod spec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodSpecPath {
    /// `spec`
    Direct,
    /// `spec.template.spec`
    Template,
    /// `spec.jobTemplate.spec.template.spec`
    JobTemplate,
}

impl PodSpecPath {
    /// Path segments from the document root
    #[must_use]
    pub fn segments(self) -> &'static [&'static str] {
        match self {
            Self::Direct => &["spec"],
            Self::Template => &["spec", "template", "spec"],
            Self::JobTemplate => &["spec", "jobTemplate", "spec", "template", "spec"],
        }
    }
}

impl ResourceKind {
    /// Classify a `kind` string
    #[must_use]
    pub fn parse(kind: &str) -> Self {
        match kind {
            "HorizontalPodAutoscaler" => Self::HorizontalPodAutoscaler,
            "PersistentVolumeClaim" => Self::PersistentVolumeClaim,
            "StatefulSet" => Self::StatefulSet,
            "Deployment" => Self::Deployment,
            "ReplicaSet" => Self::ReplicaSet,
            "DaemonSet" => Self::DaemonSet,
            "Job" => Self::Job,
            "CronJob" => Self::CronJob,
            "Pod" => Self::Pod,
            "RoleBinding" => Self::RoleBinding,
            "ClusterRoleBinding" => Self::ClusterRoleBinding,
            other => Self::Other(other.to_string()),
        }
    }

    /// Location of the embedded pod spec, if the kind has one
    #[must_use]
    pub fn pod_spec_path(&self) -> Option<PodSpecPath> {
        match self {
            Self::Pod => Some(PodSpecPath::Direct),
            Self::Deployment
            | Self::ReplicaSet
            | Self::DaemonSet
            | Self::StatefulSet
            | Self::Job => Some(PodSpecPath::Template),
            Self::CronJob => Some(PodSpecPath::JobTemplate),
            _ => None,
        }
    }

    /// Whether the kind declares `spec.replicas`
    #[inline]
    #[must_use]
    pub fn has_replicas(&self) -> bool {
        matches!(self, Self::Deployment | Self::ReplicaSet | Self::StatefulSet)
    }
}
