//! Bundle rewriting engine
//!
//! [`Generator`] owns the run-wide state (allocator, per-task counters) and
//! rewrites one [`CaseBundle`] at a time:
//!
//! ```text
//! validate → allocate identities → NameMap → stamp identity → rewrite references → normalize
//! ```
//!
//! Bundles are processed strictly in order; later allocations depend on what
//! earlier bundles reserved. A bundle that fails validation is skipped
//! before it reserves anything and the run continues.

use crate::admission::{check_deployable, is_admission_review};
use crate::allocator::NameAllocator;
use crate::config::GeneratorConfig;
use crate::deployability::{DeployabilityNormalizer, Fix, NormalizeOptions};
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::document::Document;
use crate::error::{BundleError, BundleResult};
use crate::identity::{stamp_identity, Identity, Provenance};
use crate::name_map::NameMap;
use crate::references::ReferenceRewriter;
use crate::verdict::Verdict;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// One test case: inventory documents plus the subject being judged
#[derive(Debug, Clone, PartialEq)]
pub struct CaseBundle {
    /// Owning task
    pub task_id: String,
    /// Case name within the task's test
    pub case_name: String,
    /// Verdict expected of the subject
    pub expected: Verdict,
    /// The document whose compliance is the point of the case
    pub subject: Document,
    /// Documents that must exist before the subject
    pub inventory: Vec<Document>,
}

impl CaseBundle {
    /// Create bundle without inventory
    #[must_use]
    pub fn new(
        task_id: impl Into<String>,
        case_name: impl Into<String>,
        expected: Verdict,
        subject: Document,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            case_name: case_name.into(),
            expected,
            subject,
            inventory: Vec::new(),
        }
    }

    /// With inventory documents
    #[must_use]
    pub fn with_inventory(mut self, inventory: Vec<Document>) -> Self {
        self.inventory = inventory;
        self
    }
}

/// Whether a document is the subject or a dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentRole {
    /// Pre-existing dependency
    Inventory,
    /// Document being judged
    Subject,
}

/// A document after rewriting
#[derive(Debug, Clone, PartialEq)]
pub struct RewrittenDocument {
    /// Rewritten tree
    pub document: Document,
    /// Canonical identity
    pub identity: Identity,
    /// Name before rewriting, if the source had one
    pub original_name: Option<String>,
    /// Role within the bundle
    pub role: DocumentRole,
    /// Deployability fixes applied
    pub fixes: Vec<Fix>,
}

impl RewrittenDocument {
    /// Whether the identity has no namespace
    #[inline]
    #[must_use]
    pub fn is_cluster_scoped(&self) -> bool {
        self.identity.namespace().is_none()
    }
}

/// Result of rewriting one bundle
#[derive(Debug, Clone, PartialEq)]
pub struct BundleOutput {
    /// Owning task
    pub task_id: String,
    /// Case name
    pub case_name: String,
    /// Verdict expected of the subject
    pub expected: Verdict,
    /// Inventory documents in input order, then the subject
    pub documents: Vec<RewrittenDocument>,
    /// Distinct namespaces the documents live in
    pub namespaces: BTreeSet<String>,
    /// Cluster-scoped identities created
    pub cluster_resources: Vec<Identity>,
    /// Fallbacks taken while rewriting
    pub diagnostics: Vec<Diagnostic>,
}

impl BundleOutput {
    /// The subject document
    #[must_use]
    pub fn subject(&self) -> Option<&RewrittenDocument> {
        self.documents.iter().find(|d| d.role == DocumentRole::Subject)
    }

    /// Inventory documents
    pub fn inventory(&self) -> impl Iterator<Item = &RewrittenDocument> {
        self.documents
            .iter()
            .filter(|d| d.role == DocumentRole::Inventory)
    }
}

/// Bundle that was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedBundle {
    /// Owning task
    pub task_id: String,
    /// Case name
    pub case_name: String,
    /// Why it was skipped
    pub error: BundleError,
}

#[derive(Debug, Clone, Copy)]
struct TaskCounters {
    alpha: usize,
    beta: usize,
    inventory: usize,
}

impl Default for TaskCounters {
    fn default() -> Self {
        Self {
            alpha: 1,
            beta: 1,
            inventory: 1,
        }
    }
}

impl TaskCounters {
    fn next_subject(&mut self, verdict: Verdict) -> usize {
        let counter = match verdict {
            Verdict::Compliant => &mut self.alpha,
            Verdict::Violating => &mut self.beta,
        };
        let n = *counter;
        *counter += 1;
        n
    }

    fn next_inventory(&mut self) -> usize {
        let n = self.inventory;
        self.inventory += 1;
        n
    }
}

/// Run-scoped rewriting engine
#[derive(Debug)]
pub struct Generator {
    config: GeneratorConfig,
    allocator: NameAllocator,
    normalizer: DeployabilityNormalizer,
    counters: HashMap<String, TaskCounters>,
}

impl Generator {
    /// Create generator for one run
    #[must_use]
    pub fn new(config: GeneratorConfig) -> Self {
        let normalizer = DeployabilityNormalizer::from_config(&config);
        Self {
            config,
            allocator: NameAllocator::new(),
            normalizer,
            counters: HashMap::new(),
        }
    }

    /// Names issued so far in this run
    #[inline]
    #[must_use]
    pub fn allocator(&self) -> &NameAllocator {
        &self.allocator
    }

    /// Process bundles in order, collecting outputs and skips
    pub fn run(&mut self, bundles: impl IntoIterator<Item = CaseBundle>) -> RunReport {
        let mut report = RunReport::default();
        for bundle in bundles {
            let task_id = bundle.task_id.clone();
            let case_name = bundle.case_name.clone();
            let result = self.process(bundle);
            report.record(&self.config, task_id, case_name, result);
        }
        report
    }

    /// Rewrite one bundle
    ///
    /// # Errors
    /// Returns error if the bundle is malformed or its subject cannot be
    /// deployed. Nothing is reserved in that case.
    pub fn process(&mut self, bundle: CaseBundle) -> BundleResult<BundleOutput> {
        let CaseBundle {
            task_id,
            case_name,
            expected,
            subject,
            inventory,
        } = bundle;
        let mut diagnostics = Diagnostics::new();

        validate_document(&subject, "subject", 0)?;
        if is_admission_review(&subject) {
            return Err(BundleError::AdmissionReview);
        }
        check_deployable(&subject)?;

        let mut inventory_docs = Vec::with_capacity(inventory.len());
        for (index, doc) in inventory.into_iter().enumerate() {
            validate_document(&doc, "inventory", index)?;
            if is_admission_review(&doc) {
                diagnostics.record(
                    None,
                    DiagnosticKind::DroppedInventory {
                        index,
                        reason: "AdmissionReview is not a resource".to_string(),
                    },
                );
                continue;
            }
            inventory_docs.push(doc);
        }

        let namespace = self.config.task_namespace(&task_id);
        let counters = self.counters.entry(task_id.clone()).or_default();
        let mut names = NameMap::new();
        let mut planned: Vec<(Document, Identity, Option<String>, DocumentRole)> =
            Vec::with_capacity(inventory_docs.len() + 1);

        for doc in inventory_docs {
            let kind = doc.kind().unwrap_or_default().to_string();
            let original = doc.name().map(str::to_string);
            let base = original
                .clone()
                .unwrap_or_else(|| format!("resource-inventory-{:02}", counters.next_inventory()));
            if original.is_some() {
                counters.next_inventory();
            }
            let allocation = self.allocator.allocate(&kind, Some(&namespace), &base)?;
            let identity = Identity::new(&kind, Some(&namespace), allocation.name);
            record_mapping(&mut names, &mut diagnostics, &identity, original.as_deref(), doc.namespace());
            planned.push((doc, identity, original, DocumentRole::Inventory));
        }

        let kind = subject.kind().unwrap_or_default().to_string();
        let original = subject.name().map(str::to_string);
        let canonical = loop {
            let candidate = expected.subject_name(counters.next_subject(expected));
            if self.allocator.reserve_exact(&kind, Some(&namespace), &candidate)? {
                break candidate;
            }
            tracing::debug!(%candidate, "subject name already issued, advancing counter");
        };
        let identity = Identity::new(&kind, Some(&namespace), canonical);
        record_mapping(&mut names, &mut diagnostics, &identity, original.as_deref(), subject.namespace());
        planned.push((subject, identity, original, DocumentRole::Subject));

        let options = NormalizeOptions {
            expected,
            substitute_images: !self.config.is_image_sensitive(&task_id),
        };
        let mut documents = Vec::with_capacity(planned.len());
        let mut namespaces = BTreeSet::new();
        let mut cluster_resources = Vec::new();

        for (mut doc, identity, original_name, role) in planned {
            let provenance = Provenance {
                label_prefix: &self.config.label_prefix,
                task_id: &task_id,
                expected,
                inventory: role == DocumentRole::Inventory,
            };
            stamp_identity(&mut doc, &identity, &provenance);
            ReferenceRewriter::new(&names, &namespace, &identity, &mut diagnostics)
                .rewrite(&mut doc);
            let fixes = self.normalizer.normalize(&mut doc, options);
            if !fixes.is_empty() {
                tracing::debug!(%identity, ?fixes, "deployability fixes applied");
            }

            match identity.namespace() {
                Some(ns) => {
                    namespaces.insert(ns.to_string());
                }
                None => cluster_resources.push(identity.clone()),
            }
            documents.push(RewrittenDocument {
                document: doc,
                identity,
                original_name,
                role,
                fixes,
            });
        }

        tracing::info!(
            task = %task_id,
            case = %case_name,
            documents = documents.len(),
            fallbacks = diagnostics.len(),
            "bundle rewritten"
        );
        Ok(BundleOutput {
            task_id,
            case_name,
            expected,
            documents,
            namespaces,
            cluster_resources,
            diagnostics: diagnostics.into_entries(),
        })
    }
}

fn validate_document(doc: &Document, role: &'static str, index: usize) -> BundleResult<()> {
    if !doc.is_mapping() {
        return Err(BundleError::NotAMapping { role, index });
    }
    if doc.kind().is_none() {
        return Err(BundleError::MissingKind { role, index });
    }
    Ok(())
}

/// Map the original identity, and its source-namespace alias, to `canonical`
fn record_mapping(
    names: &mut NameMap,
    diagnostics: &mut Diagnostics,
    canonical: &Identity,
    original: Option<&str>,
    source_namespace: Option<&str>,
) {
    let Some(original) = original else {
        return;
    };
    if let Some(source) = source_namespace {
        names.alias(source, original, canonical);
    }
    let previous = names.set(
        canonical.kind(),
        canonical.namespace(),
        original,
        canonical.name(),
    );
    if let Some(shadowed) = previous.filter(|p| p != canonical.name()) {
        diagnostics.record(
            Some(canonical),
            DiagnosticKind::ShadowedIdentity {
                original: canonical.with_name(original),
                shadowed,
            },
        );
    }
}

/// One manifest entry for the orchestration layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    /// Case the document belongs to
    pub case_name: String,
    /// Verdict expected of the case's subject
    pub expected: Verdict,
    /// Role within the case
    pub role: DocumentRole,
    /// Canonical identity
    #[serde(flatten)]
    pub identity: Identity,
    /// Whether the identity has no namespace
    pub cluster_scoped: bool,
}

/// Per-task bookkeeping for setup and cleanup scripting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskSummary {
    /// Task id
    pub task_id: String,
    /// Task namespace
    pub namespace: String,
    /// Every namespace touched, task namespace included, sorted
    pub namespaces: Vec<String>,
    /// Cluster-scoped identities to clean up
    pub cluster_resources: Vec<Identity>,
    /// Every rewritten document
    pub manifests: Vec<ManifestEntry>,
}

/// Outcome of a whole run
#[derive(Debug, Default, Clone)]
pub struct RunReport {
    /// Successful bundles in processing order
    pub bundles: Vec<BundleOutput>,
    /// Skipped bundles in processing order
    pub skipped: Vec<SkippedBundle>,
    summaries: BTreeMap<String, TaskSummary>,
}

impl RunReport {
    /// Record the result of one bundle
    pub fn record(
        &mut self,
        config: &GeneratorConfig,
        task_id: String,
        case_name: String,
        result: BundleResult<BundleOutput>,
    ) {
        match result {
            Ok(output) => {
                let summary = self
                    .summaries
                    .entry(task_id.clone())
                    .or_insert_with(|| TaskSummary {
                        namespace: config.task_namespace(&task_id),
                        namespaces: vec![config.task_namespace(&task_id)],
                        task_id,
                        cluster_resources: Vec::new(),
                        manifests: Vec::new(),
                    });
                for ns in &output.namespaces {
                    if let Err(pos) = summary.namespaces.binary_search(ns) {
                        summary.namespaces.insert(pos, ns.clone());
                    }
                }
                summary
                    .cluster_resources
                    .extend(output.cluster_resources.iter().cloned());
                summary
                    .manifests
                    .extend(output.documents.iter().map(|d| ManifestEntry {
                        case_name: output.case_name.clone(),
                        expected: output.expected,
                        role: d.role,
                        identity: d.identity.clone(),
                        cluster_scoped: d.is_cluster_scoped(),
                    }));
                self.bundles.push(output);
            }
            Err(error) => {
                tracing::warn!(task = %task_id, case = %case_name, %error, "bundle skipped");
                self.skipped.push(SkippedBundle {
                    task_id,
                    case_name,
                    error,
                });
            }
        }
    }

    /// Per-task summaries, sorted by task id
    pub fn summaries(&self) -> impl Iterator<Item = &TaskSummary> {
        self.summaries.values()
    }

    /// Summary of one task
    #[must_use]
    pub fn summary(&self, task_id: &str) -> Option<&TaskSummary> {
        self.summaries.get(task_id)
    }

    /// Total fallbacks recorded across bundles
    #[must_use]
    pub fn diagnostic_count(&self) -> usize {
        self.bundles.iter().map(|b| b.diagnostics.len()).sum()
    }
}
