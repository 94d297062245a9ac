use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Component, Path};

use anyhow::{anyhow, bail, Context, Result};

pub(crate) fn remove_file_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("failed to remove {}", path.display())),
    }
}

/// Removes a directory tree, treating a missing path as already removed.
pub(crate) fn remove_dir_all_if_exists(path: &Path) -> Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err).with_context(|| format!("failed to stat {}", path.display())),
    };
    if meta.file_type().is_symlink() || !meta.is_dir() {
        fs::remove_file(path).with_context(|| format!("failed to remove {}", path.display()))?;
        return Ok(());
    }
    fs::remove_dir_all(path).with_context(|| format!("failed to remove {}", path.display()))
}

pub(crate) fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir(path).with_context(|| format!("failed to create {}", path.display()))
}

pub(crate) fn create_dir_all(path: &Path) -> Result<()> {
    fs::create_dir_all(path).with_context(|| format!("failed to create {}", path.display()))
}

/// Creates (or truncates) an empty marker file.
pub(crate) fn touch(path: &Path) -> Result<()> {
    fs::File::create(path)
        .map(|_| ())
        .with_context(|| format!("failed to write marker {}", path.display()))
}

/// Writes `contents` next to `path` and renames it into place.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow!("{} has no parent directory", path.display()))?;
    let mut tmp = tempfile::Builder::new()
        .prefix(".rpmrepo-tmp")
        .tempfile_in(parent)
        .with_context(|| format!("failed to stage {}", path.display()))?;
    tmp.write_all(contents)
        .with_context(|| format!("failed to write {}", path.display()))?;
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("failed to sync {}", path.display()))?;
    tmp.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("failed to persist {}", path.display()))?;
    Ok(())
}

/// Joins the components of `path` below `root` with `/`.
pub(crate) fn relative_key(root: &Path, path: &Path) -> Result<String> {
    let rel = path.strip_prefix(root).with_context(|| {
        format!("{} is not below {}", path.display(), root.display())
    })?;
    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => {
                let part = part
                    .to_str()
                    .ok_or_else(|| anyhow!("{} is not valid UTF-8", path.display()))?;
                parts.push(part);
            }
            other => bail!("unexpected path component {other:?} in {}", path.display()),
        }
    }
    if parts.is_empty() {
        bail!("{} names the tree root itself", path.display());
    }
    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn relative_key_uses_forward_slashes() {
        let root = Path::new("/cache/repo");
        let key = relative_key(root, &root.join("Packages").join("a.rpm")).expect("key");
        assert_eq!(key, "Packages/a.rpm");
        assert!(relative_key(root, root).is_err());
        assert!(relative_key(root, Path::new("/elsewhere/a")).is_err());
    }

    #[test]
    fn removal_tolerates_missing_paths() {
        let temp = tempdir().expect("tempdir");
        let missing = temp.path().join("missing");
        remove_file_if_exists(&missing).expect("file");
        remove_dir_all_if_exists(&missing).expect("dir");

        let tree = temp.path().join("tree");
        fs::create_dir_all(tree.join("nested")).expect("mkdir");
        fs::write(tree.join("nested").join("f"), b"x").expect("write");
        remove_dir_all_if_exists(&tree).expect("remove");
        assert!(!tree.exists());
    }

    #[test]
    fn write_atomic_replaces_contents() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("dnf.conf");
        write_atomic(&path, b"first").expect("first");
        write_atomic(&path, b"second").expect("second");
        assert_eq!(fs::read(&path).expect("read"), b"second");
        let leftovers: Vec<_> = fs::read_dir(temp.path())
            .expect("read_dir")
            .flatten()
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(".rpmrepo-tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
