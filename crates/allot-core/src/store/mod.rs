//! Blob store seam.
//!
//! Everything the experiment persists — unit artifacts, worker copies, and
//! metadata blobs — goes through [`BlobStore`]. Paths are '/'-joined
//! hierarchical strings; no atomic rename is assumed or required.

mod fs;
mod memory;

pub use fs::FsStore;
pub use memory::MemoryStore;

/// Errors from the underlying blob store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object does not exist.
    #[error("object not found: {0}")]
    NotFound(String),

    /// The store itself failed (I/O, permissions, connectivity).
    #[error("store I/O failed at `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A persisted blob could not be decoded.
    #[error("corrupt blob at `{path}`: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A durable key/value object store addressed by '/'-joined paths.
///
/// Implementations must be safe to share across threads; the experiment
/// facade holds one behind an `Arc`.
pub trait BlobStore: Send + Sync {
    /// Write `bytes` at `path`, replacing any existing object.
    fn write(&self, path: &str, bytes: &[u8]) -> Result<(), StoreError>;

    /// Read the object at `path`.
    fn read(&self, path: &str) -> Result<Vec<u8>, StoreError>;

    /// List all object paths under `prefix`, sorted. A missing prefix is an
    /// empty listing, not an error.
    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Copy the object at `src` to `dst`.
    fn copy(&self, src: &str, dst: &str) -> Result<(), StoreError> {
        let bytes = self.read(src)?;
        self.write(dst, &bytes)
    }
}

/// True when `path` names an object directly under the directory `prefix`
/// or any of its subdirectories.
pub(crate) fn under_prefix(path: &str, prefix: &str) -> bool {
    let dir = prefix.trim_end_matches('/');
    path.strip_prefix(dir)
        .is_some_and(|rest| rest.starts_with('/'))
}
