//! Generator configuration
//!
//! Everything tunable about a generation run: naming prefixes, the replica
//! ceiling, and the fixed deployability tables. Loaded from TOML; every
//! field has a default so an empty file is a valid config.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Literal image replacement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSubstitution {
    /// Image reference to replace (exact match)
    pub from: String,
    /// Replacement image reference
    pub to: String,
}

impl ImageSubstitution {
    /// Create substitution
    #[must_use]
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Command override for init containers running a server image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitOverride {
    /// Substring identifying the image family
    pub image_contains: String,
    /// Command that exits immediately in that image
    pub command: Vec<String>,
}

impl InitOverride {
    /// Create override
    #[must_use]
    pub fn new(image_contains: impl Into<String>, command: &[&str]) -> Self {
        Self {
            image_contains: image_contains.into(),
            command: command.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

/// Default task ids whose policies cannot survive deployability fixes
pub const DEFAULT_SKIP_TASKS: &[&str] = &[
    "block-endpoint-default-role",
    "noupdateserviceaccount",
    "verifydeprecatedapi",
    "allowed-reposv2",
    "disallowed-tags",
    "repo-must-not-be-k8s-gcr-io",
    "container-cpu-requests-memory-limits-and-requests",
    "container-limits",
    "container-limits-and-requests",
    "container-limits-ignore-cpu",
    "container-requests",
    "ephemeral-storage-limit",
    "memory-and-cpu-ratios",
    "memory-ratio-only",
    "storageclass",
    "storageclass-allowlist",
    "container-image-must-have-digest",
    "required-probes",
];

/// Generator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Task namespace is `<namespace_prefix><task-id>`
    pub namespace_prefix: String,
    /// Provenance label keys are `<label_prefix>/<suffix>`
    pub label_prefix: String,
    /// Replica cap applied to violating documents
    pub replica_ceiling: u64,
    /// Literal image replacements
    pub image_substitutions: Vec<ImageSubstitution>,
    /// Init-container command overrides, first match wins
    pub init_overrides: Vec<InitOverride>,
    /// Tasks whose policy inspects images; no image substitution for them
    pub image_sensitive_tasks: Vec<String>,
    /// Tasks to skip entirely (exact id, or substring of the id)
    pub skip_tasks: Vec<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            namespace_prefix: "gk-".to_string(),
            label_prefix: "k8s-ai-bench".to_string(),
            replica_ceiling: 5,
            image_substitutions: vec![
                ImageSubstitution::new("tomcat", "nginx"),
                ImageSubstitution::new("nginx:1.7.9", "nginx:1.25"),
            ],
            init_overrides: vec![
                InitOverride::new("nginx", &["sh", "-c", "exit 0"]),
                InitOverride::new("opa", &["opa", "eval", "true"]),
            ],
            image_sensitive_tasks: Vec::new(),
            skip_tasks: DEFAULT_SKIP_TASKS.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

impl GeneratorConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML and validate
    ///
    /// # Errors
    /// Returns error if the TOML is malformed or a value is unusable
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::io_error(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Check values that deserialize fine but cannot work
    ///
    /// # Errors
    /// Returns the first unusable value found
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.replica_ceiling == 0 {
            return Err(ConfigError::InvalidValue {
                field: "replica_ceiling",
                message: "must be at least 1".to_string(),
            });
        }
        if self.label_prefix.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "label_prefix",
                message: "must not be empty".to_string(),
            });
        }
        if let Some(o) = self
            .init_overrides
            .iter()
            .find(|o| o.image_contains.is_empty() || o.command.is_empty())
        {
            return Err(ConfigError::InvalidValue {
                field: "init_overrides",
                message: format!("override {:?} needs an image pattern and a command", o.image_contains),
            });
        }
        Ok(())
    }

    /// With replica ceiling
    #[inline]
    #[must_use]
    pub fn with_replica_ceiling(mut self, ceiling: u64) -> Self {
        self.replica_ceiling = ceiling;
        self
    }

    /// With an image-sensitive task
    #[inline]
    #[must_use]
    pub fn with_image_sensitive_task(mut self, task_id: impl Into<String>) -> Self {
        self.image_sensitive_tasks.push(task_id.into());
        self
    }

    /// With skip list replaced
    #[inline]
    #[must_use]
    pub fn with_skip_tasks(mut self, tasks: Vec<String>) -> Self {
        self.skip_tasks = tasks;
        self
    }

    /// Namespace owned by `task_id`
    #[must_use]
    pub fn task_namespace(&self, task_id: &str) -> String {
        format!("{}{}", self.namespace_prefix, task_id)
    }

    /// Whether image substitution must be disabled for `task_id`
    #[must_use]
    pub fn is_image_sensitive(&self, task_id: &str) -> bool {
        self.image_sensitive_tasks.iter().any(|t| t == task_id)
    }

    /// Skip-list entry matching `task_id`, if any
    #[must_use]
    pub fn skip_reason(&self, task_id: &str) -> Option<&str> {
        self.skip_tasks
            .iter()
            .find(|s| !s.is_empty() && (s.as_str() == task_id || task_id.contains(s.as_str())))
            .map(String::as_str)
    }
}
