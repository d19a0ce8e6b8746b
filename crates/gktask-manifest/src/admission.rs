//! Pre-rewrite admission checks
//!
//! Filters out inputs that are not resources at all (admission request
//! envelopes) and subjects that could never start on a cluster.

use crate::document::Document;
use crate::error::BundleError;
use serde_yaml::Value;
use std::collections::HashSet;

/// Kind of admission request envelopes used by some test cases
pub const ADMISSION_REVIEW: &str = "AdmissionReview";

/// Whether `doc` is an admission request envelope
#[inline]
#[must_use]
pub fn is_admission_review(doc: &Document) -> bool {
    doc.kind() == Some(ADMISSION_REVIEW)
}

/// Check that a subject document can be deployed
///
/// Only pods are inspected: a pod spec declaring `ephemeralContainers`
/// cannot be created, and container names must be unique across
/// `containers` and `initContainers`.
///
/// # Errors
/// Returns [`BundleError::NotDeployable`] naming the problem
pub fn check_deployable(doc: &Document) -> Result<(), BundleError> {
    if doc.kind() != Some("Pod") {
        return Ok(());
    }
    let Some(spec) = doc.get_path(&["spec"]).and_then(Value::as_mapping) else {
        return Ok(());
    };
    if spec.contains_key("ephemeralContainers") {
        return Err(BundleError::not_deployable("pod declares ephemeralContainers"));
    }

    let mut seen = HashSet::new();
    for key in ["containers", "initContainers"] {
        let names = spec
            .get(key)
            .and_then(Value::as_sequence)
            .into_iter()
            .flatten()
            .filter_map(|c| c.get("name").and_then(Value::as_str));
        for name in names {
            if !seen.insert(name) {
                return Err(BundleError::not_deployable(format!(
                    "duplicate container name '{name}'"
                )));
            }
        }
    }
    Ok(())
}
