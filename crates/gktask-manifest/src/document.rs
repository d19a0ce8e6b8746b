//! Structured resource documents
//!
//! A [`Document`] is a mutable YAML tree with typed accessors for the few
//! fields the rewriter reads generically (`kind`, `metadata.name`,
//! `metadata.namespace`). Everything else is reached through path helpers
//! and interpreted per kind by the caller.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

/// One resource document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Value);

impl Document {
    /// Wrap a YAML value
    #[inline]
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Parse the first non-empty document of a YAML stream
    ///
    /// Returns `Ok(None)` when the stream holds no document.
    ///
    /// # Errors
    /// Returns error if the YAML is invalid
    pub fn from_yaml_first(content: &str) -> Result<Option<Self>, serde_yaml::Error> {
        Ok(Self::from_yaml_all(content)?.into_iter().next())
    }

    /// Parse every non-empty document of a YAML stream
    ///
    /// # Errors
    /// Returns error if any document is invalid YAML
    pub fn from_yaml_all(content: &str) -> Result<Vec<Self>, serde_yaml::Error> {
        let mut documents = Vec::new();
        for de in serde_yaml::Deserializer::from_str(content) {
            let value = Value::deserialize(de)?;
            if !value.is_null() {
                documents.push(Self(value));
            }
        }
        Ok(documents)
    }

    /// Render as YAML
    ///
    /// # Errors
    /// Returns error if the tree cannot be serialized
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self.0)
    }

    /// Whether the root is a mapping
    #[inline]
    #[must_use]
    pub fn is_mapping(&self) -> bool {
        self.0.is_mapping()
    }

    /// `kind`, if present and non-empty
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.get_str(&["kind"]).filter(|k| !k.is_empty())
    }

    /// `metadata.name`, if present and non-empty
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.get_str(&["metadata", "name"]).filter(|n| !n.is_empty())
    }

    /// `metadata.namespace`, if present and non-empty
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.get_str(&["metadata", "namespace"])
            .filter(|n| !n.is_empty())
    }

    /// Label value under `metadata.labels`
    #[must_use]
    pub fn label(&self, key: &str) -> Option<&str> {
        self.get_str(&["metadata", "labels", key])
    }

    /// Value at `path`
    #[must_use]
    pub fn get_path(&self, path: &[&str]) -> Option<&Value> {
        get_path(&self.0, path)
    }

    /// Mutable value at `path`
    pub fn get_path_mut(&mut self, path: &[&str]) -> Option<&mut Value> {
        get_path_mut(&mut self.0, path)
    }

    /// String at `path`
    #[must_use]
    pub fn get_str(&self, path: &[&str]) -> Option<&str> {
        self.get_path(path).and_then(Value::as_str)
    }

    /// Mapping at `path`, created (replacing non-mapping values) if needed
    ///
    /// An empty path returns the root, which is turned into a mapping if it
    /// is not one already.
    pub fn ensure_mapping(&mut self, path: &[&str]) -> &mut Mapping {
        ensure_mapping(&mut self.0, path)
    }

    /// Remove the entry at `path`, returning it
    pub fn remove_path(&mut self, path: &[&str]) -> Option<Value> {
        let (last, parents) = path.split_last()?;
        self.get_path_mut(parents)?.as_mapping_mut()?.remove(*last)
    }
}

impl From<Value> for Document {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Value at `path` below `root`
#[must_use]
pub fn get_path<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(root, |current, segment| current.as_mapping()?.get(*segment))
}

/// Mutable value at `path` below `root`
pub fn get_path_mut<'a>(root: &'a mut Value, path: &[&str]) -> Option<&'a mut Value> {
    path.iter().try_fold(root, |current, segment| {
        current.as_mapping_mut()?.get_mut(*segment)
    })
}

/// Mapping at `path` below `root`, created if needed
pub fn ensure_mapping<'a>(root: &'a mut Value, path: &[&str]) -> &'a mut Mapping {
    let mut current = root;
    for segment in path {
        let map = as_mapping_forced(current);
        current = map
            .entry(Value::from(*segment))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
    }
    as_mapping_forced(current)
}

fn as_mapping_forced(value: &mut Value) -> &mut Mapping {
    if !value.is_mapping() {
        *value = Value::Mapping(Mapping::new());
    }
    match value {
        Value::Mapping(map) => map,
        _ => unreachable!("value was just replaced with a mapping"),
    }
}

/// Iterate mutable mappings of a sequence field, skipping non-mapping items
pub fn mappings_mut<'a>(
    parent: &'a mut Mapping,
    key: &str,
) -> impl Iterator<Item = &'a mut Mapping> + 'a {
    parent
        .get_mut(key)
        .and_then(Value::as_sequence_mut)
        .into_iter()
        .flatten()
        .filter_map(Value::as_mapping_mut)
}
