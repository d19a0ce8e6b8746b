//! Expected verdicts and the canonical subject name form

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

static CANONICAL_SUBJECT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^resource-(alpha|beta)-(\d+)$").expect("canonical subject pattern is valid")
});

/// Verdict a subject document is expected to receive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Verdict {
    /// Complies with the policy (`alpha`)
    #[serde(rename = "alpha")]
    Compliant,
    /// Violates the policy (`beta`)
    #[serde(rename = "beta")]
    Violating,
}

impl Verdict {
    /// Role word used in names, labels and file names
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compliant => "alpha",
            Self::Violating => "beta",
        }
    }

    /// Canonical subject name for counter `n`
    #[must_use]
    pub fn subject_name(self, n: usize) -> String {
        format!("resource-{}-{:02}", self.as_str(), n)
    }

    /// Classify a canonical subject name
    ///
    /// Returns `None` for names outside the `resource-<role>-<digits>` form.
    #[must_use]
    pub fn from_canonical_name(name: &str) -> Option<Self> {
        let caps = CANONICAL_SUBJECT.captures(name)?;
        caps.get(1)?.as_str().parse().ok()
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized verdict string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown verdict '{0}', expected alpha or beta")]
pub struct UnknownVerdict(pub String);

impl FromStr for Verdict {
    type Err = UnknownVerdict;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alpha" | "compliant" => Ok(Self::Compliant),
            "beta" | "violating" => Ok(Self::Violating),
            other => Err(UnknownVerdict(other.to_string())),
        }
    }
}
