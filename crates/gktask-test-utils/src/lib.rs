//! Testing utilities for the gktask workspace
//!
//! Shared fixtures for documents and bundles.

#![allow(missing_docs)]

use gktask_manifest::{CaseBundle, Document, Verdict};

/// Parse a single YAML document, panicking on invalid fixtures
pub fn doc(yaml: &str) -> Document {
    Document::new(serde_yaml::from_str(yaml).expect("fixture is valid YAML"))
}

pub fn deployment(name: &str, replicas: u64) -> Document {
    doc(&format!(
        r"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: {name}
spec:
  replicas: {replicas}
  template:
    spec:
      containers:
      - name: app
        image: nginx:1.25
"
    ))
}

pub fn service_account(name: &str) -> Document {
    doc(&format!("apiVersion: v1\nkind: ServiceAccount\nmetadata:\n  name: {name}\n"))
}

pub fn storage_class(name: &str) -> Document {
    doc(&format!(
        "apiVersion: storage.k8s.io/v1\nkind: StorageClass\nmetadata:\n  name: {name}\nprovisioner: kubernetes.io/no-provisioner\n"
    ))
}

pub fn pvc(name: &str, storage_class: &str) -> Document {
    doc(&format!(
        "apiVersion: v1\nkind: PersistentVolumeClaim\nmetadata:\n  name: {name}\nspec:\n  storageClassName: {storage_class}\n"
    ))
}

pub fn role_binding(name: &str, service_account: &str, role: &str) -> Document {
    doc(&format!(
        r"
apiVersion: rbac.authorization.k8s.io/v1
kind: RoleBinding
metadata:
  name: {name}
subjects:
- kind: ServiceAccount
  name: {service_account}
roleRef:
  apiGroup: rbac.authorization.k8s.io
  kind: Role
  name: {role}
"
    ))
}

pub fn role(name: &str) -> Document {
    doc(&format!(
        "apiVersion: rbac.authorization.k8s.io/v1\nkind: Role\nmetadata:\n  name: {name}\nrules: []\n"
    ))
}

/// Pod using a service account and a claim
pub fn pod_with_refs(name: &str, service_account: &str, claim: &str) -> Document {
    doc(&format!(
        r"
apiVersion: v1
kind: Pod
metadata:
  name: {name}
spec:
  serviceAccountName: {service_account}
  containers:
  - name: app
    image: nginx:1.25
  volumes:
  - name: data
    persistentVolumeClaim:
      claimName: {claim}
"
    ))
}

pub fn bundle(task: &str, case: &str, expected: Verdict, subject: Document, inventory: Vec<Document>) -> CaseBundle {
    CaseBundle::new(task, case, expected, subject).with_inventory(inventory)
}
