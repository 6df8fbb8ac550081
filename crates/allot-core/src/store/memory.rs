use super::{under_prefix, BlobStore, StoreError};
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

/// In-memory [`BlobStore`] backed by a `BTreeMap`.
///
/// The primary test double, but also usable by embedders that want a
/// throwaway experiment without durable storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BlobStore for MemoryStore {
    fn write(&self, path: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.lock().insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        self.lock()
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        // BTreeMap iteration is already sorted.
        Ok(self
            .lock()
            .keys()
            .filter(|path| under_prefix(path, prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let store = MemoryStore::new();
        store.write("exp/metadata", b"{}").expect("write");
        assert_eq!(store.read("exp/metadata").expect("read"), b"{}");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn read_missing_is_not_found() {
        let store = MemoryStore::new();
        let err = store.read("missing").expect_err("should fail");
        assert!(matches!(err, StoreError::NotFound(p) if p == "missing"));
    }

    #[test]
    fn list_returns_sorted_paths_under_prefix_only() {
        let store = MemoryStore::new();
        store.write("data/.unit_0/1.txt", b"b").expect("write");
        store.write("data/.unit_0/0.txt", b"a").expect("write");
        store.write("data/.unit_1/0.txt", b"c").expect("write");

        let listed = store.list("data/.unit_0").expect("list");
        assert_eq!(listed, vec!["data/.unit_0/0.txt", "data/.unit_0/1.txt"]);
    }

    #[test]
    fn list_of_missing_prefix_is_empty() {
        let store = MemoryStore::new();
        assert!(store.list("nowhere").expect("list").is_empty());
    }
}
