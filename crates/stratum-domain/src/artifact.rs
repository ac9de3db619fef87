//! Artifact manifest model.
//!
//! An artifact is one buildable unit of the monorepo (service, library,
//! package). The manifest is the per-build snapshot of all declared
//! artifacts; it is loaded fresh for every build invocation and immutable
//! afterwards.

use crate::error::{CiError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// One artifact declared in the manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Artifact {
    /// Unique artifact name within the manifest.
    pub name: String,

    /// Directory holding the artifact, relative to the repository root.
    /// When absent the artifact lives in a top-level directory named after it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_dir: Option<String>,

    /// Declared dependency names. Only names that resolve to other manifest
    /// artifacts are considered by the graph builder.
    #[serde(default)]
    pub dependencies: BTreeSet<String>,

    /// Commit-message tags that, when they are the *only* tags on a commit
    /// touching this artifact, suppress rebuilding its dependents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_dependencies_only_on_keywords: Option<Vec<String>>,

    /// Build strategy plugin type. Opaque to the core.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Artifact {
    /// Repository-relative path of this artifact.
    pub fn path(&self) -> String {
        match &self.artifact_dir {
            Some(dir) => format!("{}/{}", dir, self.name),
            None => self.name.clone(),
        }
    }
}

/// On-disk manifest shape: an `artifacts` array.
#[derive(Debug, Deserialize)]
struct ManifestFile {
    artifacts: Vec<Artifact>,
}

/// All artifacts of a build invocation, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    artifacts: BTreeMap<String, Artifact>,
}

impl Manifest {
    /// Build a manifest from a list of artifacts, rejecting duplicate names.
    pub fn new(artifacts: Vec<Artifact>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for artifact in artifacts {
            if map.insert(artifact.name.clone(), artifact.clone()).is_some() {
                return Err(CiError::Manifest(format!(
                    "duplicate artifact name: {}",
                    artifact.name
                )));
            }
        }
        Ok(Self { artifacts: map })
    }

    /// Parse a manifest from its JSON representation.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: ManifestFile = serde_json::from_str(json)?;
        Self::new(file.artifacts)
    }

    /// Load a manifest from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CiError::Manifest(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json_str(&contents)
    }

    pub fn get(&self, name: &str) -> Option<&Artifact> {
        self.artifacts.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.artifacts.contains_key(name)
    }

    /// All artifact names, sorted.
    pub fn names(&self) -> BTreeSet<String> {
        self.artifacts.keys().cloned().collect()
    }

    /// Iterate artifacts in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Artifact)> {
        self.artifacts.iter()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}
