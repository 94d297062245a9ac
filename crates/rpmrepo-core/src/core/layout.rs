use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use thiserror::Error;

use crate::diagnostics::preconditions;
use crate::fs;

/// A required marker file was absent when a stage started.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    #[error("[RR150] repository at {path} has not been pulled successfully")]
    RepoNotReady { path: PathBuf },
    #[error("[RR151] repository at {path} has not been indexed successfully")]
    IndexNotReady { path: PathBuf },
}

impl PreconditionError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::RepoNotReady { .. } => preconditions::REPO_NOT_READY,
            Self::IndexNotReady { .. } => preconditions::INDEX_NOT_READY,
        }
    }

    #[must_use]
    pub fn hint(&self) -> &'static str {
        match self {
            Self::RepoNotReady { .. } => "run `rpmrepo pull` for this local id first",
            Self::IndexNotReady { .. } => "run `rpmrepo index` for this local id first",
        }
    }
}

/// On-disk layout of one local repository under the cache root.
///
/// ```text
/// <root>/conf/dnf.conf
/// <root>/conf/repo-ready
/// <root>/conf/index-ready
/// <root>/repo/...
/// <root>/tmp/
/// <root>/index/data/<checksum>
/// <root>/index/snapshot/...
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    /// Resolves `<cache>/<local_id>` without touching the filesystem.
    pub fn new(cache: &Path, local_id: &str) -> Result<Self> {
        if local_id.is_empty() || local_id.contains(['/', '\\']) || local_id == "." || local_id == ".."
        {
            bail!("invalid local id '{local_id}'");
        }
        Ok(Self {
            root: cache.join(local_id),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn conf_dir(&self) -> PathBuf {
        self.root.join("conf")
    }

    pub fn dnf_conf(&self) -> PathBuf {
        self.conf_dir().join("dnf.conf")
    }

    pub fn repo_ready_marker(&self) -> PathBuf {
        self.conf_dir().join("repo-ready")
    }

    pub fn index_ready_marker(&self) -> PathBuf {
        self.conf_dir().join("index-ready")
    }

    pub fn repo_dir(&self) -> PathBuf {
        self.root.join("repo")
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.root.join("tmp")
    }

    pub fn index_dir(&self) -> PathBuf {
        self.root.join("index")
    }

    pub fn index_data_dir(&self) -> PathBuf {
        self.index_dir().join("data")
    }

    pub fn index_snapshot_dir(&self) -> PathBuf {
        self.index_dir().join("snapshot")
    }

    pub fn is_repo_ready(&self) -> bool {
        self.repo_ready_marker().is_file()
    }

    pub fn is_index_ready(&self) -> bool {
        self.index_ready_marker().is_file()
    }

    pub fn require_repo_ready(&self) -> Result<(), PreconditionError> {
        if self.is_repo_ready() {
            Ok(())
        } else {
            Err(PreconditionError::RepoNotReady {
                path: self.root.clone(),
            })
        }
    }

    pub fn require_index_ready(&self) -> Result<(), PreconditionError> {
        if self.is_index_ready() {
            Ok(())
        } else {
            Err(PreconditionError::IndexNotReady {
                path: self.root.clone(),
            })
        }
    }

    /// Creates the root plus the `conf`, `repo` and `tmp` directories.
    pub fn prepare(&self) -> Result<()> {
        fs::create_dir_all(&self.conf_dir())?;
        fs::create_dir_all(&self.repo_dir())?;
        fs::create_dir_all(&self.tmp_dir())
    }
}

/// Random identifier used when no `--local` name is given.
#[must_use]
pub fn generate_local_id() -> String {
    format!("{:032x}", rand::random::<u128>())
}
