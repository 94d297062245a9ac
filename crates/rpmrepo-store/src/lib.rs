#![deny(clippy::all)]

//! Object storage seam for published blobs, refs, markers and the enumerate cache.
//!
//! The remote store offers single-key writes with read-after-write consistency
//! and nothing else: no transactions, no conditional writes. Everything the
//! publisher guarantees is built from write ordering on top of this trait.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use url::Url;

pub mod directory;
pub mod http;
pub mod memory;

pub use directory::DirectoryStore;
pub use http::HttpStore;
pub use memory::MemoryStore;

/// User metadata attached to an object (`x-amz-meta-*` on S3).
pub type Metadata = BTreeMap<String, String>;

/// Errors surfaced by object store backends.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("[RR801] object key '{0}' is not valid")]
    InvalidKey(String),
    #[error("[RR802] the {backend} backend does not support {operation}")]
    Unsupported {
        backend: &'static str,
        operation: &'static str,
    },
    #[error("[RR803] {key}: backend answered with status {status}")]
    UnexpectedStatus { key: String, status: u16 },
}

impl StoreError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidKey(_) => "RR801",
            Self::Unsupported { .. } => "RR802",
            Self::UnexpectedStatus { .. } => "RR803",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectHead {
    pub size: u64,
    pub metadata: Metadata,
}

/// One page of a lexicographically ordered key listing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListPage {
    pub keys: Vec<String>,
    /// Pass back as `start_after` to fetch the following page.
    pub next: Option<String>,
}

pub trait ObjectStore: Send + Sync {
    /// Short human-readable identity used in logs.
    fn describe(&self) -> String;

    fn put_object(&self, key: &str, body: &[u8], metadata: &Metadata) -> Result<()>;

    /// Upload a local file; backends override this to stream instead of buffering.
    fn put_file(&self, key: &str, path: &Path, metadata: &Metadata) -> Result<()> {
        let body = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        self.put_object(key, &body, metadata)
    }

    fn head(&self, key: &str) -> Result<Option<ObjectHead>>;

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// List keys starting with `prefix` that sort strictly after `start_after`.
    fn list_page(
        &self,
        prefix: &str,
        start_after: Option<&str>,
        page_size: usize,
    ) -> Result<ListPage>;
}

/// Drain every page under `prefix`, preserving backend order.
pub fn list_all(store: &dyn ObjectStore, prefix: &str, page_size: usize) -> Result<Vec<String>> {
    let mut keys = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = store.list_page(prefix, cursor.as_deref(), page_size)?;
        keys.extend(page.keys);
        match page.next {
            Some(next) if cursor.as_deref() != Some(next.as_str()) => cursor = Some(next),
            _ => break,
        }
    }
    Ok(keys)
}

/// Keys are `/`-separated, with no empty, `.` or `..` segments.
pub fn validate_key(key: &str) -> std::result::Result<(), StoreError> {
    let valid = !key.is_empty()
        && key
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..");
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

/// Open a backend from a locator: `memory:`, `dir:<path>`, an absolute path,
/// or an `http(s)://` bucket endpoint.
pub fn open_store(locator: &str) -> Result<Arc<dyn ObjectStore>> {
    let locator = locator.trim();
    if locator == "memory:" {
        return Ok(Arc::new(MemoryStore::new()));
    }
    if let Some(path) = locator.strip_prefix("dir:") {
        return Ok(Arc::new(DirectoryStore::new(PathBuf::from(path))?));
    }
    if locator.starts_with("http://") || locator.starts_with("https://") {
        let url = Url::parse(locator).with_context(|| format!("invalid store url '{locator}'"))?;
        return Ok(Arc::new(HttpStore::new(url)?));
    }
    if Path::new(locator).is_absolute() {
        return Ok(Arc::new(DirectoryStore::new(PathBuf::from(locator))?));
    }
    bail!("unrecognized store locator '{locator}' (expected memory:, dir:<path> or http(s)://)")
}

pub(crate) fn paginate<'a>(
    sorted_keys: impl Iterator<Item = &'a str>,
    prefix: &str,
    start_after: Option<&str>,
    page_size: usize,
) -> ListPage {
    let page_size = page_size.max(1);
    let mut matching = sorted_keys
        .filter(|key| key.starts_with(prefix))
        .filter(|key| start_after.map_or(true, |after| *key > after));
    let keys: Vec<String> = matching
        .by_ref()
        .take(page_size)
        .map(str::to_string)
        .collect();
    let next = if matching.next().is_some() {
        keys.last().cloned()
    } else {
        None
    };
    ListPage { keys, next }
}
