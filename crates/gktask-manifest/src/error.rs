//! Error types for manifest rewriting
//!
//! Provides error handling for:
//! - Name allocation (empty identities)
//! - Bundle validation (malformed or undeployable documents)
//! - Generator configuration loading

use std::path::PathBuf;

/// Errors raised by the [`NameAllocator`](crate::allocator::NameAllocator)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    /// Base name was empty
    #[error("empty base name for kind '{kind}'")]
    EmptyBaseName {
        /// Kind the caller tried to allocate for
        kind: String,
    },
}

/// Errors that make a single bundle unprocessable
///
/// Every variant is fatal to the bundle it was raised for and to nothing
/// else; the generator records it as a skip and moves on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BundleError {
    /// Document root is not a mapping
    #[error("{role} document #{index} is not a mapping")]
    NotAMapping {
        /// `subject` or `inventory`
        role: &'static str,
        /// Position within the bundle
        index: usize,
    },

    /// Document has no `kind`
    #[error("{role} document #{index} has no kind")]
    MissingKind {
        /// `subject` or `inventory`
        role: &'static str,
        /// Position within the bundle
        index: usize,
    },

    /// Subject is an admission request envelope rather than a resource
    #[error("subject is an AdmissionReview")]
    AdmissionReview,

    /// Subject could never start on a cluster
    #[error("subject is not deployable: {0}")]
    NotDeployable(String),

    /// Allocation failed
    #[error("allocation failed: {0}")]
    Allocation(#[from] AllocationError),
}

impl BundleError {
    /// Create not-deployable error
    pub fn not_deployable(reason: impl Into<String>) -> Self {
        Self::NotDeployable(reason.into())
    }
}

/// Errors while loading [`GeneratorConfig`](crate::config::GeneratorConfig)
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error during config read
    #[error("io error reading {}: {source}", path.display())]
    Io {
        /// Config path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config is not valid TOML for the expected shape
    #[error("invalid config: {0}")]
    InvalidToml(#[from] toml::de::Error),

    /// Config parsed but holds an unusable value
    #[error("invalid value for '{field}': {message}")]
    InvalidValue {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        message: String,
    },
}

impl ConfigError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for bundle operations
pub type BundleResult<T> = Result<T, BundleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_error_display() {
        let err = AllocationError::EmptyBaseName {
            kind: "Deployment".to_string(),
        };
        assert_eq!(err.to_string(), "empty base name for kind 'Deployment'");
    }

    #[test]
    fn bundle_error_display() {
        let err = BundleError::MissingKind {
            role: "inventory",
            index: 2,
        };
        assert_eq!(err.to_string(), "inventory document #2 has no kind");

        let err = BundleError::not_deployable("duplicate container name 'app'");
        assert!(err.to_string().contains("not deployable"));
    }

    #[test]
    fn error_conversions() {
        let err: BundleError = AllocationError::EmptyBaseName {
            kind: "Pod".to_string(),
        }
        .into();
        assert!(matches!(err, BundleError::Allocation(_)));
    }
}
