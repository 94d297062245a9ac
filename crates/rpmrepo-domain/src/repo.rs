use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::model::{SnapshotName, StorageClass};

/// Repository descriptor produced by the repo generation tooling.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RepoConfig {
    pub base_url: String,
    pub platform_id: String,
    pub snapshot_id: String,
    pub storage: StorageClass,
    /// Path exempted from snapshot-suffix rewriting; carried, never interpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub singleton: Option<String>,
}

impl RepoConfig {
    pub fn from_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).context("invalid repository descriptor")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json(&contents).with_context(|| format!("while loading {}", path.display()))
    }

    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&self.base_url)
            .with_context(|| format!("invalid base-url '{}'", self.base_url))
    }

    pub fn snapshot(&self, suffix: &str) -> Result<SnapshotName> {
        SnapshotName::new(self.snapshot_id.clone(), suffix)
    }
}
