use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use tempfile::NamedTempFile;
use tracing::debug;
use walkdir::WalkDir;

use crate::{paginate, validate_key, ListPage, Metadata, ObjectHead, ObjectStore, StoreError};

const META_DIR: &str = ".meta";
const TMP_PREFIX: &str = ".rpmrepo-tmp";

/// Bucket emulated on a local directory.
///
/// Object bodies live at `<root>/<key>`; metadata is kept in JSON sidecars at
/// `<root>/.meta/<key>.json`. Every write lands in a temp file that is renamed
/// into place, so a reader sees either the previous object or the new one.
#[derive(Clone, Debug)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root)
            .with_context(|| format!("failed to create store root {}", root.display()))?;
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        if key == META_DIR || key.starts_with(&format!("{META_DIR}/")) {
            return Err(StoreError::InvalidKey(key.to_string()).into());
        }
        Ok(self.root.join(key))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.root.join(META_DIR).join(format!("{key}.json"))
    }

    fn write_metadata(&self, key: &str, metadata: &Metadata) -> Result<()> {
        let path = self.meta_path(key);
        if metadata.is_empty() {
            return match fs::remove_file(&path) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(err) => {
                    Err(err).with_context(|| format!("failed to remove {}", path.display()))
                }
            };
        }
        let encoded = serde_json::to_vec(metadata)?;
        persist_atomically(&path, |file| {
            file.write_all(&encoded)?;
            Ok(())
        })
    }

    fn read_metadata(&self, key: &str) -> Result<Metadata> {
        let path = self.meta_path(key);
        match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("corrupt metadata sidecar {}", path.display())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Metadata::new()),
            Err(err) => Err(err).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    fn collect_keys(&self, prefix: &str) -> Result<Vec<String>> {
        // Only descend into the directory the prefix names.
        let start = match prefix.rsplit_once('/') {
            Some((dir, _)) => self.root.join(dir),
            None => self.root.clone(),
        };
        if !start.is_dir() {
            return Ok(Vec::new());
        }
        let mut keys = Vec::new();
        let walker = WalkDir::new(&start).min_depth(1).into_iter().filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            !(entry.depth() >= 1 && (name == META_DIR || name.starts_with(TMP_PREFIX)))
        });
        for entry in walker {
            let entry = entry.with_context(|| format!("failed to walk {}", start.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .map_err(|_| anyhow!("walked outside of {}", self.root.display()))?;
            let key = relative
                .components()
                .map(|component| component.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if key.starts_with(prefix) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}

impl ObjectStore for DirectoryStore {
    fn describe(&self) -> String {
        format!("dir:{}", self.root.display())
    }

    fn put_object(&self, key: &str, body: &[u8], metadata: &Metadata) -> Result<()> {
        let path = self.object_path(key)?;
        self.write_metadata(key, metadata)?;
        persist_atomically(&path, |file| {
            file.write_all(body)?;
            Ok(())
        })?;
        debug!(%key, size = body.len(), "stored object");
        Ok(())
    }

    fn put_file(&self, key: &str, source: &Path, metadata: &Metadata) -> Result<()> {
        let path = self.object_path(key)?;
        let mut input =
            File::open(source).with_context(|| format!("failed to open {}", source.display()))?;
        self.write_metadata(key, metadata)?;
        persist_atomically(&path, |file| {
            io::copy(&mut input, file)?;
            Ok(())
        })?;
        debug!(%key, source = %source.display(), "stored object from file");
        Ok(())
    }

    fn head(&self, key: &str) -> Result<Option<ObjectHead>> {
        let path = self.object_path(key)?;
        let meta = match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => return Ok(None),
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| format!("failed to stat {}", path.display()))
            }
        };
        Ok(Some(ObjectHead {
            size: meta.len(),
            metadata: self.read_metadata(key)?,
        }))
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.object_path(key)?;
        if path.is_dir() {
            return Ok(None);
        }
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    fn list_page(
        &self,
        prefix: &str,
        start_after: Option<&str>,
        page_size: usize,
    ) -> Result<ListPage> {
        let keys = self.collect_keys(prefix)?;
        Ok(paginate(
            keys.iter().map(String::as_str),
            prefix,
            start_after,
            page_size,
        ))
    }
}

fn persist_atomically(
    target: &Path,
    write: impl FnOnce(&mut File) -> io::Result<()>,
) -> Result<()> {
    let parent = target
        .parent()
        .ok_or_else(|| anyhow!("{} has no parent directory", target.display()))?;
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create {}", parent.display()))?;
    let mut tmp = tempfile::Builder::new()
        .prefix(TMP_PREFIX)
        .tempfile_in(parent)
        .with_context(|| format!("failed to create temp file in {}", parent.display()))?;
    write(tmp.as_file_mut()).with_context(|| format!("failed to write {}", target.display()))?;
    tmp.as_file_mut()
        .sync_all()
        .with_context(|| format!("failed to sync {}", target.display()))?;
    persist(tmp, target)
}

fn persist(tmp: NamedTempFile, target: &Path) -> Result<()> {
    tmp.persist(target)
        .map_err(|err| anyhow!("unable to persist {}: {}", target.display(), err.error))?;
    Ok(())
}
