use crate::store::document::{DocumentStore, StoreError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// In-memory store that also records every write, used to observe
/// checkpointing behaviour without touching the filesystem.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    documents: HashMap<PathBuf, Vec<u8>>,
    writes: HashMap<PathBuf, usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a document without counting it as a write.
    pub fn insert(&self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        let mut inner = self.inner.lock().expect("memory store mutex poisoned");
        inner.documents.insert(path.into(), contents.into());
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        let inner = self.inner.lock().expect("memory store mutex poisoned");
        inner.documents.get(path.as_ref()).cloned()
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        let inner = self.inner.lock().expect("memory store mutex poisoned");
        inner.documents.contains_key(path.as_ref())
    }

    /// Number of writes issued against `path` since the store was created.
    pub fn write_count(&self, path: impl AsRef<Path>) -> usize {
        let inner = self.inner.lock().expect("memory store mutex poisoned");
        inner.writes.get(path.as_ref()).copied().unwrap_or(0)
    }
}

impl DocumentStore for MemoryStore {
    fn read(&self, path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.get(path))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("memory store mutex poisoned");
        inner
            .documents
            .insert(path.to_path_buf(), contents.to_vec());
        *inner.writes.entry(path.to_path_buf()).or_default() += 1;
        Ok(())
    }
}
