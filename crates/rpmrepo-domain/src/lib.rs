#![deny(clippy::all)]

//! Plain records shared by the indexer, publisher, enumerator and resolver.
//!
//! Apart from loading repository descriptors nothing here performs I/O; the
//! types are inert and serializable so components pass them around by value.

pub mod checksum;
pub mod keys;
pub mod model;
pub mod repo;

pub use checksum::{Checksum, ChecksumError, CHECKSUM_PREFIX};
pub use keys::{
    blob_key, marker_basename, ref_key, thread_marker_key, thread_prefix, CACHE_KEY,
    CURRENT_CHECKSUM_FIELD, LEGACY_CHECKSUM_FIELD, THREAD_META_PREFIX, THREAD_PREFIX,
};
pub use model::{
    BlobRecord, MirrorStorage, RefEntry, SnapshotName, StorageClass, StorageGeneration,
    ThreadMarker,
};
pub use repo::RepoConfig;
