//! Plan execution and artifact layout
//!
//! ```text
//! <out>/
//!   summary.json
//!   <task>/artifacts/
//!     constraint.yaml
//!     inventory-01.yaml  alpha-01.yaml  beta-01.yaml  ...
//! ```

use crate::plan::{Plan, TaskPlan};
use gktask_manifest::constraint::strip_namespace_match;
use gktask_manifest::diagnostics::Diagnostic;
use gktask_manifest::engine::{BundleOutput, DocumentRole, TaskSummary};
use gktask_manifest::{Document, Generator, GeneratorConfig, RunReport, Verdict};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the run summary file
pub const SUMMARY_FILE: &str = "summary.json";

/// Errors raised while writing a run
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// Output file could not be written
    #[error("failed to write {}: {source}", path.display())]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Document could not be rendered
    #[error("failed to render YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Summary could not be rendered
    #[error("failed to render summary: {0}")]
    Json(#[from] serde_json::Error),
}

impl OutputError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Task left out of the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedTask {
    /// Task id
    pub task_id: String,
    /// Why it was skipped
    pub reason: String,
}

/// Case left out of the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedCase {
    /// Task id
    pub task_id: String,
    /// Case name
    pub case_name: String,
    /// Why it was skipped
    pub reason: String,
}

/// Fallback recorded while rewriting a case
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseDiagnostic {
    /// Task id
    pub task_id: String,
    /// Case name
    pub case_name: String,
    /// Recorded fallback
    #[serde(flatten)]
    pub diagnostic: Diagnostic,
}

/// Contents of `summary.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Per-task bookkeeping, sorted by task id
    pub tasks: Vec<TaskSummary>,
    /// Tasks that were not generated
    pub skipped_tasks: Vec<SkippedTask>,
    /// Cases that were not generated
    pub skipped_cases: Vec<SkippedCase>,
    /// Every fallback taken
    pub diagnostics: Vec<CaseDiagnostic>,
    /// Files written below the output directory
    pub artifacts: Vec<PathBuf>,
}

/// Per-task file counters
#[derive(Debug, Default)]
struct ArtifactCounters {
    alpha: usize,
    beta: usize,
    inventory: usize,
}

impl ArtifactCounters {
    fn next(&mut self, role: DocumentRole, expected: Verdict) -> String {
        let (prefix, counter) = match (role, expected) {
            (DocumentRole::Inventory, _) => ("inventory", &mut self.inventory),
            (DocumentRole::Subject, Verdict::Compliant) => ("alpha", &mut self.alpha),
            (DocumentRole::Subject, Verdict::Violating) => ("beta", &mut self.beta),
        };
        *counter += 1;
        format!("{prefix}-{:02}.yaml", *counter)
    }
}

/// Run every task of `plan` and write the results below `out_dir`
///
/// Bundle-level failures (unreadable case files, rejected bundles) are
/// recorded as skipped cases and an unloadable constraint skips its task;
/// only output failures abort the run.
///
/// # Errors
/// Returns error if an output file cannot be written
pub fn rewrite_plan(
    plan: &Plan,
    config: &GeneratorConfig,
    out_dir: &Path,
) -> Result<RunSummary, OutputError> {
    let mut generator = Generator::new(config.clone());
    let mut report = RunReport::default();
    let mut summary = RunSummary::default();

    fs::create_dir_all(out_dir).map_err(|e| OutputError::io(out_dir, e))?;

    for task in &plan.tasks {
        if let Some(reason) = task_skip_reason(task, config) {
            tracing::info!(task = %task.id, %reason, "task skipped");
            summary.skipped_tasks.push(SkippedTask {
                task_id: task.id.clone(),
                reason,
            });
            continue;
        }

        if let Some(constraint) = &task.constraint {
            let mut doc = match plan.load_document(constraint) {
                Ok(doc) => doc,
                Err(error) => {
                    tracing::warn!(task = %task.id, %error, "constraint not loaded, task skipped");
                    summary.skipped_tasks.push(SkippedTask {
                        task_id: task.id.clone(),
                        reason: error.to_string(),
                    });
                    continue;
                }
            };
            strip_namespace_match(&mut doc);
            let relative = task_dir(&task.id).join("constraint.yaml");
            write_document(out_dir, &relative, &doc)?;
            summary.artifacts.push(relative);
        }

        for case in &task.cases {
            match plan.load_bundle(task, case) {
                Ok(bundle) => {
                    let result = generator.process(bundle);
                    report.record(config, task.id.clone(), case.name.clone(), result);
                }
                Err(error) => {
                    tracing::warn!(task = %task.id, case = %case.name, %error, "case not loaded");
                    summary.skipped_cases.push(SkippedCase {
                        task_id: task.id.clone(),
                        case_name: case.name.clone(),
                        reason: error.to_string(),
                    });
                }
            }
        }
    }

    let mut counters: HashMap<String, ArtifactCounters> = HashMap::new();
    for output in &report.bundles {
        let counters = counters.entry(output.task_id.clone()).or_default();
        summary
            .artifacts
            .extend(write_bundle(out_dir, output, counters)?);
        summary
            .diagnostics
            .extend(output.diagnostics.iter().map(|d| CaseDiagnostic {
                task_id: output.task_id.clone(),
                case_name: output.case_name.clone(),
                diagnostic: d.clone(),
            }));
    }

    summary
        .skipped_cases
        .extend(report.skipped.iter().map(|s| SkippedCase {
            task_id: s.task_id.clone(),
            case_name: s.case_name.clone(),
            reason: s.error.to_string(),
        }));
    summary.tasks = report.summaries().cloned().collect();

    let summary_path = out_dir.join(SUMMARY_FILE);
    let json = serde_json::to_string_pretty(&summary)?;
    fs::write(&summary_path, json).map_err(|e| OutputError::io(&summary_path, e))?;

    tracing::info!(
        tasks = summary.tasks.len(),
        skipped_tasks = summary.skipped_tasks.len(),
        skipped_cases = summary.skipped_cases.len(),
        fallbacks = report.diagnostic_count(),
        "run complete"
    );
    Ok(summary)
}

fn task_skip_reason(task: &TaskPlan, config: &GeneratorConfig) -> Option<String> {
    if let Some(pattern) = config.skip_reason(&task.id) {
        return Some(format!("matches skip pattern '{pattern}'"));
    }
    if !task.has_both_verdicts() {
        return Some("task needs at least one alpha and one beta case".to_string());
    }
    None
}

fn task_dir(task_id: &str) -> PathBuf {
    Path::new(task_id).join("artifacts")
}

fn write_bundle(
    out_dir: &Path,
    output: &BundleOutput,
    counters: &mut ArtifactCounters,
) -> Result<Vec<PathBuf>, OutputError> {
    let dir = task_dir(&output.task_id);
    output
        .documents
        .iter()
        .map(|doc| {
            let relative = dir.join(counters.next(doc.role, output.expected));
            write_document(out_dir, &relative, &doc.document)?;
            Ok(relative)
        })
        .collect()
}

fn write_document(out_dir: &Path, relative: &Path, doc: &Document) -> Result<(), OutputError> {
    let path = out_dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| OutputError::io(parent, e))?;
    }
    fs::write(&path, doc.to_yaml()?).map_err(|e| OutputError::io(&path, e))
}
