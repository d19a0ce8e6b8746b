//! Generation plan
//!
//! A plan is a YAML list of tasks:
//!
//! ```yaml
//! - id: unique-label
//!   constraint: unique-label/constraint.yaml
//!   cases:
//!   - name: example-allowed
//!     expected: alpha
//!     object: unique-label/samples/allowed.yaml
//!     inventory: [unique-label/samples/inventory.yaml]
//! ```
//!
//! Relative paths resolve against the directory holding the plan.

use gktask_manifest::{CaseBundle, Document, Verdict};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Errors raised while loading a plan or the documents it names
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// File could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File is not valid YAML, or not shaped as expected
    #[error("invalid YAML in {}: {source}", path.display())]
    Yaml {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_yaml::Error,
    },

    /// File holds no document
    #[error("{} holds no document", path.display())]
    Empty {
        /// File path
        path: PathBuf,
    },

    /// Two tasks share an id
    #[error("duplicate task id '{0}'")]
    DuplicateTask(String),
}

impl PlanError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn yaml(path: &Path, source: serde_yaml::Error) -> Self {
        Self::Yaml {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// One case of a task
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CasePlan {
    /// Case name
    pub name: String,
    /// Verdict expected of the object
    pub expected: Verdict,
    /// File holding the subject document
    pub object: PathBuf,
    /// Files holding inventory documents, in order
    #[serde(default)]
    pub inventory: Vec<PathBuf>,
}

/// One task: a policy constraint and its cases
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskPlan {
    /// Task id
    pub id: String,
    /// File holding the policy constraint
    #[serde(default)]
    pub constraint: Option<PathBuf>,
    /// Cases in processing order
    #[serde(default)]
    pub cases: Vec<CasePlan>,
}

impl TaskPlan {
    /// Whether the task has at least one case of each verdict
    #[must_use]
    pub fn has_both_verdicts(&self) -> bool {
        let has = |v| self.cases.iter().any(|c| c.expected == v);
        has(Verdict::Compliant) && has(Verdict::Violating)
    }
}

/// Loaded plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    base_dir: PathBuf,
    /// Tasks in processing order
    pub tasks: Vec<TaskPlan>,
}

impl Plan {
    /// Parse plan YAML; relative paths resolve against `base_dir`
    ///
    /// # Errors
    /// Returns error if the YAML is malformed or task ids repeat
    pub fn from_yaml_str(content: &str, base_dir: impl Into<PathBuf>) -> Result<Self, PlanError> {
        let base_dir = base_dir.into();
        let tasks: Vec<TaskPlan> = if content.trim().is_empty() {
            Vec::new()
        } else {
            serde_yaml::from_str(content).map_err(|e| PlanError::yaml(&base_dir, e))?
        };

        let mut seen = HashSet::new();
        for task in &tasks {
            if !seen.insert(task.id.as_str()) {
                return Err(PlanError::DuplicateTask(task.id.clone()));
            }
        }
        Ok(Self { base_dir, tasks })
    }

    /// Load plan from file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PlanError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| PlanError::io(path, e))?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::from_yaml_str(&content, base_dir).map_err(|e| match e {
            PlanError::Yaml { source, .. } => PlanError::yaml(path, source),
            other => other,
        })
    }

    /// Resolve a plan path
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.base_dir.join(path)
    }

    /// Load the first non-empty document of a plan path
    ///
    /// # Errors
    /// Returns error if the file cannot be read, parsed, or is empty
    pub fn load_document(&self, path: &Path) -> Result<Document, PlanError> {
        load_first_document(&self.resolve(path))
    }

    /// Build the bundle for one case
    ///
    /// # Errors
    /// Returns error if any referenced file cannot be loaded
    pub fn load_bundle(&self, task: &TaskPlan, case: &CasePlan) -> Result<CaseBundle, PlanError> {
        let subject = self.load_document(&case.object)?;
        let inventory = case
            .inventory
            .iter()
            .map(|p| self.load_document(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CaseBundle::new(&task.id, &case.name, case.expected, subject).with_inventory(inventory))
    }
}

/// First non-empty YAML document in `path`
///
/// # Errors
/// Returns error if the file cannot be read, parsed, or holds no document
pub fn load_first_document(path: &Path) -> Result<Document, PlanError> {
    let content = fs::read_to_string(path).map_err(|e| PlanError::io(path, e))?;
    Document::from_yaml_first(&content)
        .map_err(|e| PlanError::yaml(path, e))?
        .ok_or_else(|| PlanError::Empty {
            path: path.to_path_buf(),
        })
}
