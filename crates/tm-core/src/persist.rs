//! Dataset file persistence.
//!
//! The dataset is read in full at startup and replaced in full on every
//! save. Saves write a sibling `<path>.tmp` and rename it into place, so an
//! interrupted save leaves the previous dataset intact.

use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tm_common::SchemaStore;
use tm_dataset::{decode_store, encode_store, DatasetError};
use tracing::{debug, info};

/// Errors from loading or saving the dataset.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("dataset {path}: {source}")]
    Dataset {
        path: PathBuf,
        #[source]
        source: DatasetError,
    },
}

impl From<PersistError> for tm_common::Error {
    fn from(err: PersistError) -> Self {
        match err {
            PersistError::Io { path, source } => tm_common::Error::Io(io::Error::new(
                source.kind(),
                format!("{}: {source}", path.display()),
            )),
            PersistError::Dataset { path, source } => {
                match tm_common::Error::from(source) {
                    tm_common::Error::CorruptSchemaData(msg) => {
                        tm_common::Error::CorruptSchemaData(format!("{}: {msg}", path.display()))
                    }
                    tm_common::Error::InvalidDiscriminatorEncoding(msg) => {
                        tm_common::Error::InvalidDiscriminatorEncoding(format!(
                            "{}: {msg}",
                            path.display()
                        ))
                    }
                    tm_common::Error::DecompressionFailure(msg) => {
                        tm_common::Error::DecompressionFailure(format!("{}: {msg}", path.display()))
                    }
                    other => other,
                }
            }
        }
    }
}

/// The on-disk dataset.
#[derive(Debug, Clone)]
pub struct DatasetFile {
    path: PathBuf,
}

impl DatasetFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the store. A missing file yields an empty store.
    pub fn load(&self) -> Result<SchemaStore, PersistError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no dataset yet, starting empty");
                return Ok(SchemaStore::new());
            }
            Err(source) => return Err(self.io_error(source)),
        };

        let store = decode_store(&bytes).map_err(|source| PersistError::Dataset {
            path: self.path.clone(),
            source,
        })?;
        info!(
            path = %self.path.display(),
            events = store.len(),
            entries = store.entry_count(),
            "dataset loaded"
        );
        Ok(store)
    }

    /// Encode `store` and atomically replace the dataset with it.
    pub fn save(&self, store: &SchemaStore) -> Result<(), PersistError> {
        let bytes = encode_store(store).map_err(|source| PersistError::Dataset {
            path: self.path.clone(),
            source,
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            }
        }

        let tmp_path = self.tmp_path();
        {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)
                .map_err(|e| self.io_error(e))?;
            file.write_all(&bytes).map_err(|e| self.io_error(e))?;
            file.flush().map_err(|e| self.io_error(e))?;
        }
        fs::rename(&tmp_path, &self.path).map_err(|e| self.io_error(e))?;

        debug!(
            path = %self.path.display(),
            events = store.len(),
            bytes = bytes.len(),
            "dataset saved"
        );
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn io_error(&self, source: io::Error) -> PersistError {
        PersistError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn sample_store() -> SchemaStore {
        let mut store = SchemaStore::new();
        let (schema, _) = store.get_or_insert("MESSAGE_CREATE");
        schema.base.merge(&json!({"content": "hi", "pinned": false}));
        store
    }

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = tempdir().unwrap();
        let dataset = DatasetFile::new(dir.path().join("types/dataset"));
        assert!(!dataset.exists());
        assert!(dataset.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_creates_parent_and_roundtrips() {
        let dir = tempdir().unwrap();
        let dataset = DatasetFile::new(dir.path().join("types/dataset"));
        let store = sample_store();

        dataset.save(&store).unwrap();
        assert!(dataset.exists());
        assert!(!dataset.tmp_path().exists());
        assert_eq!(dataset.load().unwrap(), store);
    }

    #[test]
    fn test_save_replaces_previous_contents() {
        let dir = tempdir().unwrap();
        let dataset = DatasetFile::new(dir.path().join("dataset"));
        dataset.save(&sample_store()).unwrap();
        dataset.save(&SchemaStore::new()).unwrap();
        assert!(dataset.load().unwrap().is_empty());
    }

    #[test]
    fn test_empty_file_is_empty_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dataset");
        fs::write(&path, b"").unwrap();
        assert!(DatasetFile::new(&path).load().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dataset");
        fs::write(&path, b"garbage").unwrap();

        let err = DatasetFile::new(&path).load().unwrap_err();
        assert!(matches!(
            err,
            PersistError::Dataset {
                source: DatasetError::DecompressionFailure(_),
                ..
            }
        ));
        let common: tm_common::Error = err.into();
        assert!(common.is_dataset_error());
        assert!(common.to_string().contains("dataset"));
    }
}
