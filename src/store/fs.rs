use crate::store::document::{DocumentStore, StoreError};
use std::fs::{self, File};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Filesystem-backed store. Writes land in a sibling temp file, which is
/// fsynced and then renamed over the target, so readers never observe a
/// half-written document.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileStore;

impl FileStore {
    pub fn new() -> Self {
        Self
    }

    fn staging_path(path: &Path) -> PathBuf {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_owned());
        path.with_file_name(format!(".{file_name}.tmp"))
    }

    fn write_synced(path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut file = File::create(path)?;
        file.write_all(contents)?;
        file.sync_all()
    }
}

impl DocumentStore for FileStore {
    fn read(&self, path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<(), StoreError> {
        let staging = Self::staging_path(path);
        let io_error = |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Err(source) = Self::write_synced(&staging, contents) {
            let _ = fs::remove_file(&staging);
            return Err(io_error(source));
        }
        if let Err(source) = fs::rename(&staging, path) {
            let _ = fs::remove_file(&staging);
            return Err(io_error(source));
        }

        tracing::debug!(path = %path.display(), bytes = contents.len(), "document written");
        Ok(())
    }
}
