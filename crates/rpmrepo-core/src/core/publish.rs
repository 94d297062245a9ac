//! Uploading an index to the object store.
//!
//! Blobs are pushed by content address and can be re-pushed at will. A
//! snapshot is committed in two phases: every ref leaf is written first and
//! only then the thread marker. Readers treat a snapshot without a marker as
//! nonexistent, so a publish that dies halfway is invisible.

use anyhow::{bail, Result};
use serde::Serialize;
use tracing::info;

use rpmrepo_domain::{
    ref_key, thread_marker_key, BlobRecord, RefEntry, SnapshotName, StorageClass,
    CURRENT_CHECKSUM_FIELD,
};
use rpmrepo_store::{Metadata, ObjectStore};

use crate::core::index::ReferenceTree;
use crate::core::layout::CacheLayout;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PushSummary {
    pub uploaded: usize,
    pub marker: Option<String>,
}

/// Proof that every leaf of a [`SnapshotPublication`] has been written.
#[derive(Debug)]
pub struct LeavesWritten {
    refs: usize,
}

impl LeavesWritten {
    pub fn refs(&self) -> usize {
        self.refs
    }
}

/// The full write plan for one snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotPublication {
    snapshot: SnapshotName,
    refs: Vec<RefEntry>,
}

impl SnapshotPublication {
    pub fn new(snapshot: SnapshotName, refs: Vec<RefEntry>) -> Self {
        Self { snapshot, refs }
    }

    pub fn snapshot(&self) -> &SnapshotName {
        &self.snapshot
    }

    pub fn marker_key(&self) -> String {
        thread_marker_key(&self.snapshot.marker())
    }

    /// Writes one zero-length ref object per entry.
    pub fn write_leaves(&self, store: &dyn ObjectStore) -> Result<LeavesWritten> {
        let total = self.refs.len();
        for (index, entry) in self.refs.iter().enumerate() {
            let key = ref_key(&self.snapshot, &entry.path);
            let mut metadata = Metadata::new();
            metadata.insert(
                CURRENT_CHECKSUM_FIELD.to_string(),
                entry.checksum.as_str().to_string(),
            );
            info!(
                index = index + 1,
                total,
                "[{}/{}] '{}' -> '{}'",
                index + 1,
                total,
                key,
                entry.checksum
            );
            store.put_object(&key, &[], &metadata)?;
        }
        Ok(LeavesWritten { refs: total })
    }

    /// Makes the snapshot visible. Requires the leaves to be in place.
    pub fn write_commit(&self, store: &dyn ObjectStore, leaves: LeavesWritten) -> Result<String> {
        let key = self.marker_key();
        store.put_object(&key, &[], &Metadata::new())?;
        info!(marker = %key, refs = leaves.refs, "committed snapshot {}", self.snapshot);
        Ok(key)
    }
}

pub struct Publisher<'a> {
    layout: &'a CacheLayout,
    store: &'a dyn ObjectStore,
}

impl<'a> Publisher<'a> {
    pub fn new(layout: &'a CacheLayout, store: &'a dyn ObjectStore) -> Self {
        Self { layout, store }
    }

    /// Uploads every blob of the index under `data/<storage>/<platform>/`.
    pub fn push_data(&self, storage: StorageClass, platform_id: &str) -> Result<PushSummary> {
        self.layout.require_index_ready()?;
        if platform_id.is_empty() || platform_id.contains('/') {
            bail!("invalid platform id '{platform_id}'");
        }
        let blobs = ReferenceTree::new(self.layout).blobs()?;
        let total = blobs.len();
        for (index, (checksum, path)) in blobs.into_iter().enumerate() {
            let record = BlobRecord {
                storage,
                platform_id: platform_id.to_string(),
                checksum,
            };
            let key = record.key();
            info!(index = index + 1, total, "[{}/{}] '{}'", index + 1, total, key);
            self.store.put_file(&key, &path, &Metadata::new())?;
        }
        info!(store = %self.store.describe(), total, "pushed blobs");
        Ok(PushSummary {
            uploaded: total,
            marker: None,
        })
    }

    /// Publishes the index as `snapshot`, leaves first, marker last.
    ///
    /// Every mirror entry is read and validated before the first write.
    pub fn push_snapshot(&self, snapshot: &SnapshotName) -> Result<PushSummary> {
        self.layout.require_index_ready()?;
        let refs = ReferenceTree::new(self.layout).refs()?;
        let publication = SnapshotPublication::new(snapshot.clone(), refs);
        let leaves = publication.write_leaves(self.store)?;
        let uploaded = leaves.refs();
        let marker = publication.write_commit(self.store, leaves)?;
        Ok(PushSummary {
            uploaded,
            marker: Some(marker),
        })
    }
}
