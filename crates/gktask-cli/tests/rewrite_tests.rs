use gktask_cli::{rewrite_plan, Plan};
use gktask_manifest::{Document, GeneratorConfig};
use gktask_test_utils::{deployment, service_account};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const CONSTRAINT: &str = r"
apiVersion: constraints.gatekeeper.sh/v1beta1
kind: K8sReplicaLimits
metadata:
  name: replica-limits
spec:
  match:
    kinds: [{apiGroups: [apps], kinds: [Deployment]}]
    namespaces: [production]
  parameters:
    ranges: [{min_replicas: 1, max_replicas: 3}]
";

const PLAN: &str = r"
- id: replica-limits
  constraint: replica-limits/constraint.yaml
  cases:
  - name: example-allowed
    expected: alpha
    object: replica-limits/allowed.yaml
    inventory: [replica-limits/sa.yaml]
  - name: example-disallowed
    expected: beta
    object: replica-limits/disallowed.yaml
  - name: missing-file
    expected: beta
    object: replica-limits/nope.yaml
- id: only-alpha
  cases:
  - name: example-allowed
    expected: alpha
    object: replica-limits/allowed.yaml
";

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn fixture() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "plan.yaml", PLAN);
    write(root, "replica-limits/constraint.yaml", CONSTRAINT);
    write(root, "replica-limits/allowed.yaml", &deployment("web", 2).to_yaml().unwrap());
    write(root, "replica-limits/disallowed.yaml", &deployment("web", 100).to_yaml().unwrap());
    // Trailing documents after the first are ignored.
    let sa = format!("---\n{}---\nkind: ConfigMap\n", service_account("builder").to_yaml().unwrap());
    write(root, "replica-limits/sa.yaml", &sa);
    dir
}

fn read_doc(path: PathBuf) -> Document {
    Document::from_yaml_first(&fs::read_to_string(path).unwrap()).unwrap().unwrap()
}

#[test]
fn test_rewrite_writes_artifacts_and_summary() {
    let input = fixture();
    let out = TempDir::new().unwrap();
    let plan = Plan::from_file(input.path().join("plan.yaml")).unwrap();

    let summary = rewrite_plan(&plan, &GeneratorConfig::default(), out.path()).unwrap();

    let artifacts: Vec<_> = summary.artifacts.iter().map(|p| p.to_string_lossy().into_owned()).collect();
    assert_eq!(
        artifacts,
        vec![
            "replica-limits/artifacts/constraint.yaml",
            "replica-limits/artifacts/inventory-01.yaml",
            "replica-limits/artifacts/alpha-01.yaml",
            "replica-limits/artifacts/beta-01.yaml",
        ]
    );

    let dir = out.path().join("replica-limits/artifacts");
    let constraint = read_doc(dir.join("constraint.yaml"));
    assert!(constraint.get_path(&["spec", "match", "namespaces"]).is_none());
    assert!(constraint.get_path(&["spec", "match", "kinds"]).is_some());

    let sa = read_doc(dir.join("inventory-01.yaml"));
    assert_eq!(sa.kind(), Some("ServiceAccount"));
    assert_eq!(sa.name(), Some("builder"));
    assert_eq!(sa.namespace(), Some("gk-replica-limits"));

    let alpha = read_doc(dir.join("alpha-01.yaml"));
    assert_eq!(alpha.name(), Some("resource-alpha-01"));
    assert_eq!(alpha.get_path(&["spec", "replicas"]).and_then(serde_yaml::Value::as_u64), Some(2));

    let beta = read_doc(dir.join("beta-01.yaml"));
    assert_eq!(beta.name(), Some("resource-beta-01"));
    assert_eq!(beta.get_path(&["spec", "replicas"]).and_then(serde_yaml::Value::as_u64), Some(5));

    assert_eq!(summary.skipped_tasks.len(), 1);
    assert_eq!(summary.skipped_tasks[0].task_id, "only-alpha");
    assert_eq!(summary.skipped_cases.len(), 1);
    assert_eq!(summary.skipped_cases[0].case_name, "missing-file");
}

#[test]
fn test_summary_json_lists_namespaces_and_manifests() {
    let input = fixture();
    let out = TempDir::new().unwrap();
    let plan = Plan::from_file(input.path().join("plan.yaml")).unwrap();
    rewrite_plan(&plan, &GeneratorConfig::default(), out.path()).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.path().join("summary.json")).unwrap()).unwrap();
    let task = &json["tasks"][0];
    assert_eq!(task["task_id"], "replica-limits");
    assert_eq!(task["namespaces"], serde_json::json!(["gk-replica-limits"]));
    assert_eq!(task["manifests"].as_array().unwrap().len(), 3);
    assert_eq!(task["manifests"][2]["name"], "resource-beta-01");
    assert_eq!(task["manifests"][2]["expected"], "beta");
    assert_eq!(task["manifests"][2]["role"], "subject");
    assert_eq!(json["skipped_tasks"][0]["task_id"], "only-alpha");
}

#[test]
fn test_skip_list_excludes_task() {
    let input = fixture();
    let out = TempDir::new().unwrap();
    let plan = Plan::from_file(input.path().join("plan.yaml")).unwrap();
    let config = GeneratorConfig::default().with_skip_tasks(vec!["replica".to_string()]);

    let summary = rewrite_plan(&plan, &config, out.path()).unwrap();

    assert!(summary.tasks.is_empty());
    assert!(summary.artifacts.is_empty());
    assert_eq!(summary.skipped_tasks[0].reason, "matches skip pattern 'replica'");
    assert!(!out.path().join("replica-limits").exists());
}

#[test]
fn test_missing_constraint_skips_task_and_run_continues() {
    let input = fixture();
    let plan = r"
- id: broken
  constraint: broken/missing.yaml
  cases:
  - {name: allowed, expected: alpha, object: replica-limits/allowed.yaml}
  - {name: disallowed, expected: beta, object: replica-limits/disallowed.yaml}
- id: good
  constraint: replica-limits/constraint.yaml
  cases:
  - {name: allowed, expected: alpha, object: replica-limits/allowed.yaml}
  - {name: disallowed, expected: beta, object: replica-limits/disallowed.yaml}
";
    write(input.path(), "partial.yaml", plan);
    let out = TempDir::new().unwrap();
    let plan = Plan::from_file(input.path().join("partial.yaml")).unwrap();

    let summary = rewrite_plan(&plan, &GeneratorConfig::default(), out.path()).unwrap();

    assert_eq!(summary.skipped_tasks.len(), 1);
    assert_eq!(summary.skipped_tasks[0].task_id, "broken");
    assert!(summary.skipped_tasks[0].reason.contains("missing.yaml"));
    assert_eq!(summary.tasks.len(), 1);
    assert_eq!(summary.tasks[0].task_id, "good");
    assert!(!out.path().join("broken").exists());
    assert!(out.path().join("good/artifacts/constraint.yaml").exists());
    assert!(out.path().join("good/artifacts/beta-01.yaml").exists());
    assert!(out.path().join("summary.json").exists());
}
