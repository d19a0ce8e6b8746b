//! Deployability normalization
//!
//! Narrow structural fixes that let rewritten resources start on a real
//! cluster without moving them across the policy line:
//!
//! - **Replica capping**: violating documents with more replicas than the
//!   ceiling are clamped to it. The ceiling stays above every replica
//!   threshold the policies enforce, so a violation stays a violation.
//! - **Init-container pacification**: init containers running a known
//!   server image get a command that exits at once. Main containers are
//!   never touched.
//! - **Image substitution**: exact-match replacement of images that cannot
//!   be pulled or started, disabled for tasks whose policy inspects images.
//!
//! Every rule is total and idempotent; a document outside a rule's
//! precondition comes back unchanged.

use crate::config::{GeneratorConfig, ImageSubstitution, InitOverride};
use crate::document::{mappings_mut, Document};
use crate::kind::ResourceKind;
use crate::verdict::Verdict;
use serde_yaml::{Mapping, Value};

/// One fix that changed a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fix {
    /// `spec.replicas` was clamped
    ReplicasCapped {
        /// Declared count
        from: u64,
        /// Ceiling it was clamped to
        to: u64,
    },
    /// An init container's command was overridden
    InitCommandOverridden {
        /// Container name (empty if unnamed)
        container: String,
    },
    /// A container image was replaced
    ImageSubstituted {
        /// Container name (empty if unnamed)
        container: String,
        /// Original image
        from: String,
        /// Replacement
        to: String,
    },
}

/// Per-document switches decided by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Verdict the bundle's subject is expected to receive
    pub expected: Verdict,
    /// Whether image substitution is allowed for this task
    pub substitute_images: bool,
}

/// Applies the deployability rules
#[derive(Debug, Clone)]
pub struct DeployabilityNormalizer {
    replica_ceiling: u64,
    init_overrides: Vec<InitOverride>,
    image_substitutions: Vec<ImageSubstitution>,
}

impl DeployabilityNormalizer {
    /// Create normalizer with explicit tables
    #[must_use]
    pub fn new(
        replica_ceiling: u64,
        init_overrides: Vec<InitOverride>,
        image_substitutions: Vec<ImageSubstitution>,
    ) -> Self {
        Self {
            replica_ceiling,
            init_overrides,
            image_substitutions,
        }
    }

    /// Create normalizer from generator configuration
    #[must_use]
    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self::new(
            config.replica_ceiling,
            config.init_overrides.clone(),
            config.image_substitutions.clone(),
        )
    }

    /// Apply every rule to `doc`, returning the fixes that changed it
    pub fn normalize(&self, doc: &mut Document, options: NormalizeOptions) -> Vec<Fix> {
        let kind = ResourceKind::parse(doc.kind().unwrap_or_default());
        let mut fixes = Vec::new();

        if options.expected == Verdict::Violating && kind.has_replicas() {
            fixes.extend(self.cap_replicas(doc));
        }

        let Some(path) = kind.pod_spec_path() else {
            return fixes;
        };
        let Some(pod_spec) = doc
            .get_path_mut(path.segments())
            .and_then(Value::as_mapping_mut)
        else {
            return fixes;
        };

        // Pacification matches on the final image.
        if options.substitute_images {
            self.substitute_images(pod_spec, &mut fixes);
        }
        self.pacify_init_containers(pod_spec, &mut fixes);
        fixes
    }

    /// Clamp `spec.replicas` to the ceiling
    pub fn cap_replicas(&self, doc: &mut Document) -> Option<Fix> {
        let replicas = doc.get_path_mut(&["spec", "replicas"])?;
        let declared = replica_count(replicas)?;
        if declared <= self.replica_ceiling {
            return None;
        }
        *replicas = Value::from(self.replica_ceiling);
        Some(Fix::ReplicasCapped {
            from: declared,
            to: self.replica_ceiling,
        })
    }

    fn pacify_init_containers(&self, pod_spec: &mut Mapping, fixes: &mut Vec<Fix>) {
        for container in mappings_mut(pod_spec, "initContainers") {
            let image = container.get("image").and_then(Value::as_str).unwrap_or_default();
            let Some(rule) = self
                .init_overrides
                .iter()
                .find(|o| image.contains(o.image_contains.as_str()))
            else {
                continue;
            };

            let command: Vec<Value> = rule.command.iter().map(|c| Value::from(c.as_str())).collect();
            let already = container.get("command").and_then(Value::as_sequence) == Some(&command)
                && !container.contains_key("args");
            if already {
                continue;
            }
            container.insert(Value::from("command"), Value::Sequence(command));
            container.remove("args");
            fixes.push(Fix::InitCommandOverridden {
                container: container_name(container),
            });
        }
    }

    fn substitute_images(&self, pod_spec: &mut Mapping, fixes: &mut Vec<Fix>) {
        for key in ["containers", "initContainers"] {
            for container in mappings_mut(pod_spec, key) {
                let Some(image) = container.get("image").and_then(Value::as_str) else {
                    continue;
                };
                let Some(sub) = self.image_substitutions.iter().find(|s| s.from == image) else {
                    continue;
                };
                let from = image.to_string();
                container.insert(Value::from("image"), Value::from(sub.to.as_str()));
                fixes.push(Fix::ImageSubstituted {
                    container: container_name(container),
                    from,
                    to: sub.to.clone(),
                });
            }
        }
    }
}

impl Default for DeployabilityNormalizer {
    fn default() -> Self {
        Self::from_config(&GeneratorConfig::default())
    }
}

/// Integral replica count, accepting floats with no fractional part
fn replica_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        }),
        _ => None,
    }
}

fn container_name(container: &Mapping) -> String {
    container
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn doc(yaml: &str) -> Document {
        Document::new(serde_yaml::from_str(yaml).unwrap())
    }

    fn options(expected: Verdict) -> NormalizeOptions {
        NormalizeOptions {
            expected,
            substitute_images: true,
        }
    }

    #[test]
    fn violating_replicas_are_capped() {
        let normalizer = DeployabilityNormalizer::default();
        let mut d = doc("kind: Deployment\nspec:\n  replicas: 100\n");
        let fixes = normalizer.normalize(&mut d, options(Verdict::Violating));

        assert_eq!(d.get_path(&["spec", "replicas"]).and_then(Value::as_u64), Some(5));
        assert_eq!(fixes, vec![Fix::ReplicasCapped { from: 100, to: 5 }]);
    }

    #[test]
    fn compliant_replicas_are_kept() {
        let normalizer = DeployabilityNormalizer::default();
        let mut d = doc("kind: Deployment\nspec:\n  replicas: 3\n");
        assert!(normalizer.normalize(&mut d, options(Verdict::Compliant)).is_empty());
        assert_eq!(d.get_path(&["spec", "replicas"]).and_then(Value::as_u64), Some(3));

        let mut big = doc("kind: Deployment\nspec:\n  replicas: 50\n");
        normalizer.normalize(&mut big, options(Verdict::Compliant));
        assert_eq!(big.get_path(&["spec", "replicas"]).and_then(Value::as_u64), Some(50));
    }

    #[test]
    fn float_replicas_are_capped() {
        let normalizer = DeployabilityNormalizer::default();
        let mut d = doc("kind: StatefulSet\nspec:\n  replicas: 20.0\n");
        normalizer.normalize(&mut d, options(Verdict::Violating));
        assert_eq!(d.get_path(&["spec", "replicas"]).and_then(Value::as_u64), Some(5));
    }

    #[test]
    fn replicas_at_ceiling_untouched() {
        let normalizer = DeployabilityNormalizer::default();
        let mut d = doc("kind: ReplicaSet\nspec:\n  replicas: 5\n");
        assert!(normalizer.normalize(&mut d, options(Verdict::Violating)).is_empty());
    }

    #[test]
    fn init_container_gets_exit_command_main_container_untouched() {
        let normalizer = DeployabilityNormalizer::default();
        let mut d = doc(r"
kind: Pod
spec:
  initContainers:
  - name: init
    image: nginx:1.25
    args: [--serve]
  containers:
  - name: main
    image: nginx:1.25
");
        let fixes = normalizer.normalize(&mut d, options(Verdict::Compliant));

        let init = &d.get_path(&["spec", "initContainers"]).unwrap()[0];
        assert_eq!(init["command"], serde_yaml::from_str::<Value>("[sh, -c, exit 0]").unwrap());
        assert!(init.get("args").is_none());
        let main = &d.get_path(&["spec", "containers"]).unwrap()[0];
        assert!(main.get("command").is_none());
        assert_eq!(fixes, vec![Fix::InitCommandOverridden { container: "init".into() }]);
    }

    #[test]
    fn shell_less_image_gets_native_noop() {
        let normalizer = DeployabilityNormalizer::default();
        let mut d = doc(r"
kind: Deployment
spec:
  template:
    spec:
      initContainers:
      - name: policy
        image: openpolicyagent/opa:0.9.2
");
        normalizer.normalize(&mut d, options(Verdict::Violating));
        let init = &d.get_path(&["spec", "template", "spec", "initContainers"]).unwrap()[0];
        assert_eq!(init["command"], serde_yaml::from_str::<Value>("[opa, eval, 'true']").unwrap());
    }

    #[test]
    fn images_substituted_exactly() {
        let normalizer = DeployabilityNormalizer::default();
        let mut d = doc(r"
kind: Pod
spec:
  containers:
  - {name: a, image: tomcat}
  - {name: b, image: 'tomcat:9'}
  - {name: c, image: 'nginx:1.7.9'}
");
        let fixes = normalizer.normalize(&mut d, options(Verdict::Compliant));
        let containers = d.get_path(&["spec", "containers"]).unwrap();
        assert_eq!(containers[0]["image"].as_str(), Some("nginx"));
        assert_eq!(containers[1]["image"].as_str(), Some("tomcat:9"));
        assert_eq!(containers[2]["image"].as_str(), Some("nginx:1.25"));
        assert_eq!(fixes.len(), 2);
    }

    #[test]
    fn substituted_init_image_is_pacified() {
        let normalizer = DeployabilityNormalizer::default();
        let mut d = doc("kind: Pod\nspec:\n  initContainers:\n  - {name: setup, image: tomcat, args: [run]}\n");
        let fixes = normalizer.normalize(&mut d, options(Verdict::Compliant));

        assert_eq!(
            fixes,
            vec![
                Fix::ImageSubstituted {
                    container: "setup".into(),
                    from: "tomcat".into(),
                    to: "nginx".into(),
                },
                Fix::InitCommandOverridden { container: "setup".into() },
            ]
        );
        let init = &d.get_path(&["spec", "initContainers"]).unwrap()[0];
        assert_eq!(init["command"], serde_yaml::from_str::<Value>("[sh, -c, exit 0]").unwrap());
    }

    #[test]
    fn image_substitution_can_be_disabled() {
        let normalizer = DeployabilityNormalizer::default();
        let mut d = doc("kind: Pod\nspec:\n  containers:\n  - {name: a, image: tomcat}\n");
        let fixes = normalizer.normalize(
            &mut d,
            NormalizeOptions {
                expected: Verdict::Compliant,
                substitute_images: false,
            },
        );
        assert!(fixes.is_empty());
    }

    #[test]
    fn normalize_is_idempotent() {
        let normalizer = DeployabilityNormalizer::default();
        let mut d = doc(r"
kind: Deployment
spec:
  replicas: 40
  template:
    spec:
      initContainers:
      - {name: i, image: nginx}
      - {name: t, image: tomcat, args: [run]}
      containers:
      - {name: m, image: 'nginx:1.7.9'}
");
        normalizer.normalize(&mut d, options(Verdict::Violating));
        let init = &d.get_path(&["spec", "template", "spec", "initContainers"]).unwrap()[1];
        assert_eq!(init["image"].as_str(), Some("nginx"));
        assert_eq!(init["command"], serde_yaml::from_str::<Value>("[sh, -c, exit 0]").unwrap());
        assert!(init.get("args").is_none());

        let once = d.clone();
        let fixes = normalizer.normalize(&mut d, options(Verdict::Violating));
        assert_eq!(d, once);
        assert!(fixes.is_empty());
    }

    #[test]
    fn non_workloads_unchanged() {
        let normalizer = DeployabilityNormalizer::default();
        let mut d = doc("kind: ConfigMap\nspec:\n  replicas: 100\n");
        let before = d.clone();
        assert!(normalizer.normalize(&mut d, options(Verdict::Violating)).is_empty());
        assert_eq!(d, before);
    }
}
