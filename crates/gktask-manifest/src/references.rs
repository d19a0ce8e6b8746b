//! Reference rewriting
//!
//! Walks the kind-specific fields of a document that point at other
//! documents and replaces each pointer with the canonical name recorded in
//! the bundle's [`NameMap`]. Each rule names its field and its resolution
//! scope explicitly:
//!
//! | Kind | Field | Resolved as |
//! |---|---|---|
//! | `HorizontalPodAutoscaler` | `spec.scaleTargetRef.name` | `scaleTargetRef.kind` in the home namespace |
//! | `PersistentVolumeClaim` | `spec.storageClassName` | `StorageClass` at cluster scope |
//! | `StatefulSet` | `volumeClaimTemplates[].spec.storageClassName` | `StorageClass` at cluster scope |
//! | pod-template carriers, `Pod` | `serviceAccountName` | `ServiceAccount` in the home namespace |
//! | pod-template carriers, `Pod` | `volumes[].persistentVolumeClaim.claimName` | `PersistentVolumeClaim` in the home namespace |
//! | `RoleBinding`, `ClusterRoleBinding` | `subjects[kind=ServiceAccount]` name and namespace | `ServiceAccount` in the subject's namespace (home if unset); a hit takes the canonical name and namespace |
//! | `RoleBinding`, `ClusterRoleBinding` | `roleRef.name` | `Role` in the home namespace, or the cluster-scoped `roleRef.kind` |
//!
//! A reference with no mapping keeps its written value and is recorded as a
//! diagnostic; it usually names a built-in object outside the bundle.

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::document::{mappings_mut, Document};
use crate::identity::Identity;
use crate::kind::ResourceKind;
use crate::name_map::NameMap;
use serde_yaml::{Mapping, Value};

/// Rewrites the references of one document
#[derive(Debug)]
pub struct ReferenceRewriter<'a> {
    names: &'a NameMap,
    home_namespace: &'a str,
    document: &'a Identity,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> ReferenceRewriter<'a> {
    /// Create rewriter for the document whose canonical identity is `document`
    ///
    /// `home_namespace` is the namespace namespaced references resolve in:
    /// the task namespace every namespaced document of the bundle lives in.
    #[must_use]
    pub fn new(
        names: &'a NameMap,
        home_namespace: &'a str,
        document: &'a Identity,
        diagnostics: &'a mut Diagnostics,
    ) -> Self {
        Self {
            names,
            home_namespace,
            document,
            diagnostics,
        }
    }

    /// Rewrite every reference `doc` carries for its kind
    pub fn rewrite(&mut self, doc: &mut Document) {
        let kind = ResourceKind::parse(doc.kind().unwrap_or_default());
        match &kind {
            ResourceKind::HorizontalPodAutoscaler => self.rewrite_scale_target(doc),
            ResourceKind::PersistentVolumeClaim => {
                if let Some(spec) = mapping_at(doc, &["spec"]) {
                    self.rewrite_storage_class(spec, "spec.storageClassName");
                }
            }
            ResourceKind::StatefulSet => {
                self.rewrite_claim_templates(doc);
                self.rewrite_pod_spec_of(doc, &kind);
            }
            ResourceKind::Deployment
            | ResourceKind::ReplicaSet
            | ResourceKind::DaemonSet
            | ResourceKind::Job
            | ResourceKind::CronJob
            | ResourceKind::Pod => self.rewrite_pod_spec_of(doc, &kind),
            ResourceKind::RoleBinding | ResourceKind::ClusterRoleBinding => {
                self.rewrite_binding(doc);
            }
            ResourceKind::Other(_) => {}
        }
    }

    fn rewrite_scale_target(&mut self, doc: &mut Document) {
        let Some(target) = mapping_at(doc, &["spec", "scaleTargetRef"]) else {
            return;
        };
        let Some(target_kind) = target
            .get("kind")
            .and_then(Value::as_str)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
        else {
            return;
        };
        let home = Some(self.home_namespace);
        self.rewrite_field(target, "name", "spec.scaleTargetRef.name", &target_kind, home);
    }

    fn rewrite_storage_class(&mut self, spec: &mut Mapping, field: &str) {
        self.rewrite_field(spec, "storageClassName", field, "StorageClass", None);
    }

    fn rewrite_claim_templates(&mut self, doc: &mut Document) {
        let Some(spec) = mapping_at(doc, &["spec"]) else {
            return;
        };
        for (i, template) in mappings_mut(spec, "volumeClaimTemplates").enumerate() {
            if let Some(claim_spec) = template.get_mut("spec").and_then(Value::as_mapping_mut) {
                let field = format!("spec.volumeClaimTemplates[{i}].spec.storageClassName");
                self.rewrite_storage_class(claim_spec, &field);
            }
        }
    }

    fn rewrite_pod_spec_of(&mut self, doc: &mut Document, kind: &ResourceKind) {
        let Some(path) = kind.pod_spec_path() else {
            return;
        };
        let segments = path.segments();
        if let Some(pod_spec) = mapping_at(doc, segments) {
            self.rewrite_pod_spec(pod_spec, &segments.join("."));
        }
    }

    /// Pod-spec rules shared by every kind that embeds a pod
    fn rewrite_pod_spec(&mut self, pod_spec: &mut Mapping, prefix: &str) {
        let home = Some(self.home_namespace);
        self.rewrite_field(
            pod_spec,
            "serviceAccountName",
            &format!("{prefix}.serviceAccountName"),
            "ServiceAccount",
            home,
        );

        for (i, volume) in mappings_mut(pod_spec, "volumes").enumerate() {
            if let Some(claim) = volume
                .get_mut("persistentVolumeClaim")
                .and_then(Value::as_mapping_mut)
            {
                let field = format!("{prefix}.volumes[{i}].persistentVolumeClaim.claimName");
                self.rewrite_field(claim, "claimName", &field, "PersistentVolumeClaim", home);
            }
        }
    }

    fn rewrite_binding(&mut self, doc: &mut Document) {
        let home = self.home_namespace;
        let root = doc.ensure_mapping(&[]);

        for (i, subject) in mappings_mut(root, "subjects").enumerate() {
            if subject.get("kind").and_then(Value::as_str) != Some("ServiceAccount") {
                continue;
            }
            let written_ns = subject
                .get("namespace")
                .and_then(Value::as_str)
                .filter(|ns| !ns.is_empty())
                .map(str::to_string);
            let Some(name) = subject
                .get("name")
                .and_then(Value::as_str)
                .filter(|n| !n.is_empty())
                .map(str::to_string)
            else {
                continue;
            };
            let lookup_ns = written_ns.as_deref().unwrap_or(home);

            match self.names.canonical("ServiceAccount", Some(lookup_ns), &name).cloned() {
                Some(target) => {
                    let target_ns = target.namespace().unwrap_or(home);
                    if target.name() != name || target_ns != lookup_ns {
                        tracing::debug!(subject = i, from = %name, to = %target, "binding subject rewritten");
                    }
                    subject.insert(Value::from("name"), Value::from(target.name()));
                    subject.insert(Value::from("namespace"), Value::from(target_ns));
                }
                None => {
                    self.unresolved(format!("subjects[{i}].name"), "ServiceAccount", Some(lookup_ns), name);
                    if written_ns.is_none() {
                        subject.insert(Value::from("namespace"), Value::from(home));
                    }
                }
            }
        }

        if let Some(role_ref) = root.get_mut("roleRef").and_then(Value::as_mapping_mut) {
            let ref_kind = role_ref
                .get("kind")
                .and_then(Value::as_str)
                .filter(|k| !k.is_empty())
                .unwrap_or("Role")
                .to_string();
            let ref_ns = (ref_kind == "Role").then_some(home);
            self.rewrite_field(role_ref, "name", "roleRef.name", &ref_kind, ref_ns);
        }
    }

    /// Replace the string at `map[key]` with its canonical name
    ///
    /// Missing, non-string and empty values are skipped silently; unmapped
    /// values are kept and recorded.
    fn rewrite_field(
        &mut self,
        map: &mut Mapping,
        key: &str,
        field: &str,
        kind: &str,
        namespace: Option<&str>,
    ) {
        let Some(current) = map
            .get(key)
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
        else {
            return;
        };

        match self.names.lookup(kind, namespace, &current) {
            Some(canonical) => {
                if canonical != current {
                    tracing::debug!(field, from = %current, to = canonical, "reference rewritten");
                }
                map.insert(Value::from(key), Value::from(canonical));
            }
            None => self.unresolved(field.to_string(), kind, namespace, current),
        }
    }

    fn unresolved(&mut self, field: String, kind: &str, namespace: Option<&str>, name: String) {
        self.diagnostics.record(
            Some(self.document),
            DiagnosticKind::UnresolvedReference {
                field,
                target: Identity::new(kind, namespace, name),
            },
        );
    }
}

fn mapping_at<'d>(doc: &'d mut Document, path: &[&str]) -> Option<&'d mut Mapping> {
    doc.get_path_mut(path).and_then(Value::as_mapping_mut)
}
