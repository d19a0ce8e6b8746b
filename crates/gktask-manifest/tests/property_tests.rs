use gktask_manifest::prelude::*;
use gktask_manifest::scope::{is_cluster_scoped, Scope, CLUSTER_SCOPED_KINDS};
use gktask_test_utils::{bundle, deployment, doc, service_account};
use proptest::prelude::*;
use std::collections::HashSet;

const KINDS: &[&str] = &[
    "ServiceAccount",
    "ConfigMap",
    "Deployment",
    "Role",
    "StorageClass",
    "ClusterRole",
    "Namespace",
    "PersistentVolumeClaim",
];

const NAMES: &[&str] = &["a", "b", "web", "resource-alpha-01", "resource-beta-02", "web-2"];

fn named(kind: &str, name: &str) -> Document {
    doc(&format!("kind: {kind}\nmetadata:\n  name: {name}\n"))
}

const CARRIERS: &[&str] = &["Pod", "Deployment", "ReplicaSet", "DaemonSet", "StatefulSet", "Job", "CronJob"];

/// Workload of `kind` whose pod spec uses `account`, plus the pod spec path
fn carrier(kind: &str, account: &str) -> (Document, Vec<&'static str>) {
    let pod_spec = format!("serviceAccountName: {account}\ncontainers: [{{name: app, image: 'nginx:1.25'}}]");
    let path = match kind {
        "Pod" => vec!["spec"],
        "CronJob" => vec!["spec", "jobTemplate", "spec", "template", "spec"],
        _ => vec!["spec", "template", "spec"],
    };
    let mut yaml = format!("kind: {kind}\nmetadata:\n  name: app\n");
    for (level, key) in path.iter().enumerate() {
        yaml.push_str(&format!("{}{key}:\n", "  ".repeat(level)));
    }
    for line in pod_spec.lines() {
        yaml.push_str(&format!("{}{line}\n", "  ".repeat(path.len())));
    }
    (doc(&yaml), path)
}

fn kind_strategy() -> impl Strategy<Value = &'static str> {
    prop::sample::select(KINDS)
}

fn name_strategy() -> impl Strategy<Value = &'static str> {
    prop::sample::select(NAMES)
}

fn verdict_strategy() -> impl Strategy<Value = Verdict> {
    prop_oneof![Just(Verdict::Compliant), Just(Verdict::Violating)]
}

fn bundle_strategy() -> impl Strategy<Value = CaseBundle> {
    (
        0..3usize,
        verdict_strategy(),
        (kind_strategy(), name_strategy()),
        prop::collection::vec((kind_strategy(), name_strategy()), 0..5),
    )
        .prop_map(|(task, verdict, (kind, name), inventory)| {
            bundle(
                &format!("task-{task}"),
                "case",
                verdict,
                named(kind, name),
                inventory.into_iter().map(|(k, n)| named(k, n)).collect(),
            )
        })
}

proptest! {
    #[test]
    fn prop_identities_unique_across_run(bundles in prop::collection::vec(bundle_strategy(), 1..12)) {
        let mut engine = Generator::new(GeneratorConfig::default());
        let report = engine.run(bundles);

        prop_assert!(report.skipped.is_empty());
        let mut seen = HashSet::new();
        for doc in report.bundles.iter().flat_map(|b| b.documents.iter()) {
            prop_assert!(seen.insert(doc.identity.clone()), "duplicate identity {}", doc.identity);
        }
        prop_assert_eq!(seen.len(), engine.allocator().len());
    }

    #[test]
    fn prop_namespace_matches_scope(bundles in prop::collection::vec(bundle_strategy(), 1..8)) {
        let mut engine = Generator::new(GeneratorConfig::default());
        let report = engine.run(bundles);

        for out in &report.bundles {
            let home = format!("gk-{}", out.task_id);
            for rewritten in &out.documents {
                let kind = rewritten.identity.kind();
                if is_cluster_scoped(kind) {
                    prop_assert_eq!(rewritten.document.namespace(), None);
                    prop_assert!(rewritten
                        .document
                        .get_path(&["metadata", "namespace"])
                        .is_none());
                } else {
                    prop_assert_eq!(rewritten.document.namespace(), Some(home.as_str()));
                }
                prop_assert_eq!(rewritten.document.name(), Some(rewritten.identity.name()));
            }
        }
    }

    #[test]
    fn prop_in_bundle_references_reach_canonical_names(
        cases in prop::collection::vec(
            (
                prop::collection::btree_set(name_strategy(), 0..4),
                name_strategy(),
                prop::sample::select(CARRIERS),
            ),
            1..8,
        )
    ) {
        let mut engine = Generator::new(GeneratorConfig::default());
        for (accounts, referenced, kind) in cases {
            let inventory = accounts.iter().map(|n| service_account(n)).collect();
            let (subject, pod_spec) = carrier(kind, referenced);
            let out = engine
                .process(bundle("refs", "case", Verdict::Compliant, subject, inventory))
                .unwrap();

            let target = out
                .inventory()
                .find(|d| d.original_name.as_deref() == Some(referenced))
                .map(|d| d.identity.name().to_string());
            let mut field = pod_spec;
            field.push("serviceAccountName");
            let written = out.subject().unwrap().document.get_str(&field).map(str::to_string);
            prop_assert_eq!(written, Some(target.unwrap_or_else(|| referenced.to_string())));
        }
    }

    #[test]
    fn prop_verdict_survives_normalization(replicas in 0..1000u64, verdict in verdict_strategy()) {
        let mut engine = Generator::new(GeneratorConfig::default());
        let out = engine
            .process(bundle("replicas", "case", verdict, deployment("web", replicas), vec![]))
            .unwrap();
        let subject = out.subject().unwrap();
        let after = subject.document.get_path(&["spec", "replicas"]).and_then(serde_yaml::Value::as_u64);

        match verdict {
            Verdict::Compliant => prop_assert_eq!(after, Some(replicas)),
            Verdict::Violating => prop_assert_eq!(after, Some(replicas.min(5))),
        }
        prop_assert_eq!(Verdict::from_canonical_name(subject.identity.name()), Some(verdict));
        prop_assert_eq!(subject.document.label("k8s-ai-bench/expected"), Some(verdict.as_str()));
    }

    #[test]
    fn prop_scope_classification_is_stable(kind in "[A-Z][a-zA-Z]{0,24}") {
        let first = is_cluster_scoped(&kind);
        prop_assert_eq!(first, is_cluster_scoped(&kind));
        prop_assert_eq!(first, CLUSTER_SCOPED_KINDS.contains(&kind.as_str()));
        prop_assert_eq!(Scope::of(&kind) == Scope::Cluster, first);
    }
}

#[test]
fn test_every_listed_kind_is_cluster_scoped() {
    for kind in CLUSTER_SCOPED_KINDS {
        assert!(is_cluster_scoped(kind), "{kind}");
    }
    assert!(!is_cluster_scoped("Pod"));
    assert!(!is_cluster_scoped("clusterrole"));
}
