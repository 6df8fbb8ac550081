use super::{BlobStore, StoreError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Filesystem-backed [`BlobStore`] rooted at a directory.
///
/// Object path segments map to directory components under the root, so the
/// layout on disk matches the '/'-joined object paths one-to-one.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_path(&self, object: &str) -> PathBuf {
        let mut path = self.root.clone();
        for segment in object.split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path
    }

    fn io_err(path: &str, source: io::Error) -> StoreError {
        if source.kind() == io::ErrorKind::NotFound {
            StoreError::NotFound(path.to_string())
        } else {
            StoreError::Io {
                path: path.to_string(),
                source,
            }
        }
    }

    fn ensure_parent(&self, object: &str, file: &Path) -> Result<(), StoreError> {
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::Io {
                path: object.to_string(),
                source: e,
            })?;
        }
        Ok(())
    }

    fn walk(dir: &Path, object_prefix: &str, out: &mut Vec<String>) -> io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let object = format!("{object_prefix}/{name}");
            if entry.file_type()?.is_dir() {
                Self::walk(&entry.path(), &object, out)?;
            } else {
                out.push(object);
            }
        }
        Ok(())
    }
}

impl BlobStore for FsStore {
    fn write(&self, path: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let file = self.file_path(path);
        self.ensure_parent(path, &file)?;
        fs::write(&file, bytes).map_err(|e| StoreError::Io {
            path: path.to_string(),
            source: e,
        })
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        fs::read(self.file_path(path)).map_err(|e| Self::io_err(path, e))
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let dir = self.file_path(prefix);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        Self::walk(&dir, prefix.trim_end_matches('/'), &mut out).map_err(|e| StoreError::Io {
            path: prefix.to_string(),
            source: e,
        })?;
        out.sort();
        Ok(out)
    }

    fn copy(&self, src: &str, dst: &str) -> Result<(), StoreError> {
        let dst_file = self.file_path(dst);
        self.ensure_parent(dst, &dst_file)?;
        fs::copy(self.file_path(src), &dst_file)
            .map(|_| ())
            .map_err(|e| Self::io_err(src, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_and_list_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsStore::new(dir.path());

        store.write("exp/data/.unit_0/0.txt", b"hello").expect("write");
        store.write("exp/data/.unit_0/0.ann", b"").expect("write");
        store.write("exp/data/.unit_1/0.txt", b"other").expect("write");

        assert_eq!(store.read("exp/data/.unit_0/0.txt").expect("read"), b"hello");
        assert_eq!(
            store.list("exp/data/.unit_0").expect("list"),
            vec!["exp/data/.unit_0/0.ann", "exp/data/.unit_0/0.txt"]
        );
    }

    #[test]
    fn missing_object_maps_to_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsStore::new(dir.path());
        let err = store.read("exp/absent").expect_err("should fail");
        assert!(matches!(err, StoreError::NotFound(p) if p == "exp/absent"));
    }

    #[test]
    fn copy_preserves_content_and_creates_parents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsStore::new(dir.path());
        store.write("a/one.txt", b"payload").expect("write");
        store.copy("a/one.txt", "b/deep/one.txt").expect("copy");
        assert_eq!(store.read("b/deep/one.txt").expect("read"), b"payload");
    }

    #[test]
    fn list_missing_prefix_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsStore::new(dir.path());
        assert!(store.list("nothing/here").expect("list").is_empty());
    }
}
