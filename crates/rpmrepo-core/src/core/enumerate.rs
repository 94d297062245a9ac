use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use rpmrepo_domain::{marker_basename, thread_prefix, CACHE_KEY, THREAD_META_PREFIX};
use rpmrepo_store::{list_all, Metadata, ObjectStore};

/// Sorted basenames of every committed marker under `thread` (or every thread).
///
/// Keys under `data/thread/meta/` are bookkeeping, not markers. A thread id
/// that is not a single key segment holds no markers and is never listed.
pub fn scan_snapshots(
    store: &dyn ObjectStore,
    thread: Option<&str>,
    page_size: usize,
) -> Result<Vec<String>> {
    if let Some(thread) = thread {
        if matches!(thread, "" | "." | "..") || thread.contains('/') {
            debug!(thread = %thread, "thread id is not a key segment");
            return Ok(Vec::new());
        }
    }
    let prefix = thread_prefix(thread);
    let keys = list_all(store, &prefix, page_size)
        .with_context(|| format!("failed to list '{prefix}' on {}", store.describe()))?;
    let mut names: Vec<String> = keys
        .iter()
        .filter(|key| !key.starts_with(THREAD_META_PREFIX))
        .filter_map(|key| marker_basename(key))
        .map(str::to_string)
        .collect();
    names.sort();
    Ok(names)
}

/// The exact body stored in (and served from) the enumerate cache.
pub fn render_snapshot_list(names: &[String]) -> Result<Vec<u8>> {
    let mut body = serde_json::to_vec_pretty(names).context("failed to encode snapshot list")?;
    body.push(b'\n');
    Ok(body)
}

pub struct Enumerator<'a> {
    store: &'a dyn ObjectStore,
    page_size: usize,
}

impl<'a> Enumerator<'a> {
    pub fn new(store: &'a dyn ObjectStore, page_size: usize) -> Self {
        Self { store, page_size }
    }

    /// Scans every thread and replaces the cache object wholesale.
    pub fn rebuild_cache(&self) -> Result<Vec<String>> {
        let names = scan_snapshots(self.store, None, self.page_size)?;
        let body = render_snapshot_list(&names)?;
        self.store.put_object(CACHE_KEY, &body, &Metadata::new())?;
        info!(snapshots = names.len(), key = CACHE_KEY, "enumerate cache written");
        Ok(names)
    }

    /// The body an enumerate request answers with.
    ///
    /// Unscoped requests serve the cache verbatim when it exists; scoped
    /// requests and cache misses scan the store.
    pub fn snapshot_list(&self, thread: Option<&str>) -> Result<Vec<u8>> {
        if thread.is_none() {
            match self.store.get(CACHE_KEY) {
                Ok(Some(body)) => return Ok(body),
                Ok(None) => {}
                Err(err) => warn!(error = %err, "enumerate cache unreadable, scanning"),
            }
        }
        let names = scan_snapshots(self.store, thread, self.page_size)?;
        render_snapshot_list(&names)
    }
}
