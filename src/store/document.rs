//! Storage seam shared by every pipeline stage. Documents are always read and
//! written whole; there is no partial patching.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug)]
pub enum StoreError {
    Missing {
        path: PathBuf,
    },
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    Encode {
        path: PathBuf,
        source: serde_json::Error,
    },
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl StoreError {
    pub fn path(&self) -> &Path {
        match self {
            StoreError::Missing { path }
            | StoreError::Malformed { path, .. }
            | StoreError::Encode { path, .. }
            | StoreError::Io { path, .. } => path,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, StoreError::Missing { .. })
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, StoreError::Malformed { .. })
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Missing { path } => write!(f, "{} not found", path.display()),
            StoreError::Malformed { path, source } => {
                write!(f, "{} is not valid JSON: {source}", path.display())
            }
            StoreError::Encode { path, source } => {
                write!(f, "failed to encode {}: {source}", path.display())
            }
            StoreError::Io { path, source } => {
                write!(f, "i/o error on {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Missing { .. } => None,
            StoreError::Malformed { source, .. } | StoreError::Encode { source, .. } => {
                Some(source)
            }
            StoreError::Io { source, .. } => Some(source),
        }
    }
}

/// Reads and replaces whole documents addressed by path.
pub trait DocumentStore: Send + Sync {
    /// Returns `Ok(None)` when nothing is stored at `path`.
    fn read(&self, path: &Path) -> Result<Option<Vec<u8>>, StoreError>;

    /// Replaces the document at `path` with `contents`.
    fn write(&self, path: &Path, contents: &[u8]) -> Result<(), StoreError>;
}

impl<S: DocumentStore + ?Sized> DocumentStore for Arc<S> {
    fn read(&self, path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).read(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<(), StoreError> {
        (**self).write(path, contents)
    }
}

/// Loads and decodes a required JSON document.
pub fn load_json<T, S>(store: &S, path: &Path) -> Result<T, StoreError>
where
    T: DeserializeOwned,
    S: DocumentStore + ?Sized,
{
    let bytes = store.read(path)?.ok_or_else(|| StoreError::Missing {
        path: path.to_path_buf(),
    })?;
    serde_json::from_slice(&bytes).map_err(|source| StoreError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

/// Encodes `value` as two-space indented JSON and replaces the document.
pub fn save_json<T, S>(store: &S, path: &Path, value: &T) -> Result<(), StoreError>
where
    T: Serialize + ?Sized,
    S: DocumentStore + ?Sized,
{
    let rendered = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    store.write(path, &rendered)
}
