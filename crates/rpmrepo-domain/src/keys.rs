//! Remote key scheme shared by the publisher, enumerator and resolver.

use crate::checksum::Checksum;
use crate::model::{SnapshotName, StorageClass, ThreadMarker};

/// Metadata field holding the checksum on refs in the current bucket.
pub const CURRENT_CHECKSUM_FIELD: &str = "rpmrepo-checksum";
/// Metadata field holding the checksum on refs in the legacy `rpmci` bucket.
pub const LEGACY_CHECKSUM_FIELD: &str = "rpmci-checksum";

pub const THREAD_PREFIX: &str = "data/thread/";
pub const THREAD_META_PREFIX: &str = "data/thread/meta/";
pub const CACHE_KEY: &str = "data/thread/meta/cache.json";

pub fn blob_key(storage: StorageClass, platform_id: &str, checksum: &Checksum) -> String {
    format!("data/{storage}/{platform_id}/{checksum}")
}

pub fn ref_key(snapshot: &SnapshotName, path: &str) -> String {
    format!("data/ref/{snapshot}/{path}")
}

pub fn thread_marker_key(marker: &ThreadMarker) -> String {
    format!("{THREAD_PREFIX}{}/{}", marker.thread_id, marker.name)
}

/// Listing prefix for all markers, or for the markers of one thread.
pub fn thread_prefix(thread: Option<&str>) -> String {
    match thread {
        Some(thread) => format!("{THREAD_PREFIX}{thread}/"),
        None => THREAD_PREFIX.to_string(),
    }
}

/// Final path segment of a marker key; `None` for keys ending in `/`.
pub fn marker_basename(key: &str) -> Option<&str> {
    let basename = key.rsplit_once('/').map_or(key, |(_, tail)| tail);
    (!basename.is_empty()).then_some(basename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_follow_bucket_layout() {
        let snapshot = SnapshotName::new("f40", "-1").unwrap();
        let checksum = Checksum::of_bytes(b"rpm");
        assert_eq!(
            blob_key(StorageClass::Public, "f40", &checksum),
            format!("data/public/f40/{checksum}")
        );
        assert_eq!(
            ref_key(&snapshot, "repodata/repomd.xml"),
            "data/ref/f40-1/repodata/repomd.xml"
        );
        assert_eq!(thread_marker_key(&snapshot.marker()), "data/thread/f40/f40-1");
        assert_eq!(thread_prefix(Some("f40")), "data/thread/f40/");
        assert_eq!(thread_prefix(None), "data/thread/");
    }

    #[test]
    fn basename_skips_directory_keys() {
        assert_eq!(marker_basename("data/thread/f40/f40-1"), Some("f40-1"));
        assert_eq!(marker_basename("data/thread/f40/"), None);
        assert_eq!(marker_basename("plain"), Some("plain"));
    }
}
