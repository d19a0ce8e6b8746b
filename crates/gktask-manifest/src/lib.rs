//! gktask Manifest Rewriting Engine
//!
//! Turns policy test cases into isolated, deployable benchmark resources.
//! Each case is a [`CaseBundle`]: a subject document expected to comply
//! (`alpha`) or violate (`beta`) a policy, plus the inventory documents it
//! depends on.
//!
//! # Core Operations
//!
//! - **Identity**: assign every document a run-unique canonical name in the
//!   task namespace and stamp provenance labels
//! - **References**: carry every rename through the fields other documents
//!   use to point at it, scoped by kind and namespace
//! - **Deployability**: patch details that would keep a resource from
//!   starting, without moving it across the policy line
//!
//! # Architecture
//!
//! ```text
//! CaseBundle → validate → NameAllocator → NameMap → stamp_identity → ReferenceRewriter → DeployabilityNormalizer → BundleOutput
//!                             ↑ run-wide     ↑ per bundle
//! ```
//!
//! # Example
//!
//! ```rust
//! use gktask_manifest::prelude::*;
//!
//! let subject = Document::from_yaml_first("kind: Deployment\nmetadata:\n  name: web\nspec:\n  replicas: 100\n")
//!     .unwrap()
//!     .unwrap();
//! let mut generator = Generator::new(GeneratorConfig::default());
//! let output = generator
//!     .process(CaseBundle::new("replica-limits", "too-many", Verdict::Violating, subject))
//!     .unwrap();
//!
//! let rewritten = output.subject().unwrap();
//! assert_eq!(rewritten.identity.name(), "resource-beta-01");
//! assert_eq!(rewritten.document.namespace(), Some("gk-replica-limits"));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

// Core modules
pub mod admission;
pub mod allocator;
pub mod config;
pub mod constraint;
pub mod deployability;
pub mod diagnostics;
pub mod document;
pub mod engine;
pub mod error;
pub mod identity;
pub mod kind;
pub mod name_map;
pub mod references;
pub mod scope;
pub mod verdict;

// Re-exports for convenience
pub use allocator::{Allocation, NameAllocator};
pub use config::GeneratorConfig;
pub use document::Document;
pub use engine::{BundleOutput, CaseBundle, DocumentRole, Generator, RunReport};
pub use error::{AllocationError, BundleError, ConfigError};
pub use identity::Identity;
pub use name_map::NameMap;
pub use scope::{is_cluster_scoped, Scope};
pub use verdict::Verdict;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving the engine
    pub use crate::config::GeneratorConfig;
    pub use crate::diagnostics::{Diagnostic, DiagnosticKind};
    pub use crate::document::Document;
    pub use crate::engine::{
        BundleOutput, CaseBundle, DocumentRole, Generator, RewrittenDocument, RunReport,
        TaskSummary,
    };
    pub use crate::error::{BundleError, ConfigError};
    pub use crate::identity::Identity;
    pub use crate::verdict::Verdict;
}
