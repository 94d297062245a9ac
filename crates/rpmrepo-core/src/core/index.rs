//! Content-addressed indexing of a pulled repository.
//!
//! Every regular file under `repo/` is hashed, hard-linked into
//! `index/data/<checksum>` and mirrored as a checksum-only file under
//! `index/snapshot/`. Nothing outside the `index/` tree is modified.

use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use rpmrepo_domain::{Checksum, RefEntry};

use crate::core::layout::CacheLayout;
use crate::fs;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IndexSummary {
    pub files: usize,
    pub blobs: usize,
    pub directories: usize,
    pub skipped: usize,
}

/// Streams `path` through SHA-256.
pub fn checksum_file(path: &Path) -> Result<Checksum> {
    let mut file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    Checksum::of_reader(&mut file).with_context(|| format!("failed to hash {}", path.display()))
}

pub struct Indexer<'a> {
    layout: &'a CacheLayout,
}

impl<'a> Indexer<'a> {
    pub fn new(layout: &'a CacheLayout) -> Self {
        Self { layout }
    }

    /// Rebuilds `index/` from scratch and writes `conf/index-ready` last.
    ///
    /// Fails with [`crate::PreconditionError`] when the repository has not
    /// been pulled.
    pub fn index(&self) -> Result<IndexSummary> {
        self.layout.require_repo_ready()?;

        fs::remove_file_if_exists(&self.layout.index_ready_marker())?;
        fs::remove_dir_all_if_exists(&self.layout.index_dir())?;
        fs::create_dir(&self.layout.index_dir())?;
        fs::create_dir(&self.layout.index_data_dir())?;
        fs::create_dir(&self.layout.index_snapshot_dir())?;

        let repo = self.layout.repo_dir();
        let data = self.layout.index_data_dir();
        let snapshot = self.layout.index_snapshot_dir();
        let mut summary = IndexSummary::default();

        // Pre-order walk: a directory is always yielded before its contents.
        for entry in WalkDir::new(&repo)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry =
                entry.with_context(|| format!("failed to walk {}", repo.display()))?;
            let rel = entry
                .path()
                .strip_prefix(&repo)
                .with_context(|| format!("{} escaped the repo tree", entry.path().display()))?;
            let file_type = entry.file_type();
            if file_type.is_dir() {
                fs::create_dir(&snapshot.join(rel))?;
                summary.directories += 1;
            } else if file_type.is_file() {
                let checksum = checksum_file(entry.path())?;
                let mirror = snapshot.join(rel);
                std::fs::write(&mirror, checksum.as_str())
                    .with_context(|| format!("failed to write {}", mirror.display()))?;
                if link_blob(entry.path(), &data.join(checksum.as_str()))? {
                    summary.blobs += 1;
                }
                summary.files += 1;
                debug!(path = %rel.display(), checksum = %checksum, "indexed");
            } else {
                warn!(path = %entry.path().display(), "skipping non-regular file");
                summary.skipped += 1;
            }
        }

        fs::touch(&self.layout.index_ready_marker())?;
        info!(
            files = summary.files,
            blobs = summary.blobs,
            skipped = summary.skipped,
            "index complete"
        );
        Ok(summary)
    }
}

/// Returns whether a new blob was created; an existing one already holds
/// identical content.
fn link_blob(source: &Path, target: &Path) -> Result<bool> {
    match std::fs::hard_link(source, target) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(err) => Err(err).with_context(|| {
            format!(
                "failed to link {} to {}",
                source.display(),
                target.display()
            )
        }),
    }
}

/// Read side of an index: the checksum mirror and the blob set.
pub struct ReferenceTree<'a> {
    layout: &'a CacheLayout,
}

impl<'a> ReferenceTree<'a> {
    pub fn new(layout: &'a CacheLayout) -> Self {
        Self { layout }
    }

    /// Every mirrored file as a ref entry, sorted by path.
    ///
    /// A mirror file whose content is not a valid checksum is an error.
    pub fn refs(&self) -> Result<Vec<RefEntry>> {
        let root = self.layout.index_snapshot_dir();
        let mut refs = Vec::new();
        for path in regular_files(&root)? {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let checksum = Checksum::parse(&contents)
                .with_context(|| format!("corrupt index entry {}", path.display()))?;
            refs.push(RefEntry {
                path: fs::relative_key(&root, &path)?,
                checksum,
            });
        }
        refs.sort();
        Ok(refs)
    }

    /// Every blob in `index/data`, sorted by checksum.
    pub fn blobs(&self) -> Result<Vec<(Checksum, PathBuf)>> {
        let root = self.layout.index_data_dir();
        let mut blobs = Vec::new();
        for path in regular_files(&root)? {
            let name = fs::relative_key(&root, &path)?;
            let checksum = Checksum::parse(&name)
                .with_context(|| format!("unexpected file {} in blob store", path.display()))?;
            blobs.push((checksum, path));
        }
        blobs.sort();
        Ok(blobs)
    }
}

fn regular_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
