// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tempfile::NamedTempFile;
use tether_core::{FlagStore, StorageError};
use thiserror::Error;

#[derive(Debug, Error)]
enum FileStoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{path} is not a JSON object of strings: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl From<FileStoreError> for StorageError {
    fn from(e: FileStoreError) -> Self {
        match e {
            FileStoreError::Io { .. } => StorageError::Io(e.to_string()),
            FileStoreError::Format { .. } => StorageError::Format(e.to_string()),
        }
    }
}

/// A flag store persisted as a JSON object in a single file.
///
/// The file is read once when the store is opened and rewritten on every
/// [`FlagStore::set`], so values survive restarts of the process.
#[derive(Debug)]
pub struct FileFlagStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileFlagStore {
    /// Opens the store at `path`. A missing file reads as an empty store.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or decoded.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content).map_err(|source| {
                FileStoreError::Format {
                    path: path.clone(),
                    source,
                }
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => {
                return Err(FileStoreError::Io {
                    path: path.clone(),
                    source,
                }
                .into())
            }
        };

        log::debug!("Opened flag store {} ({} keys).", path.display(), values.len());
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    /// The file backing the store.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<(), FileStoreError> {
        let io_error = |source| FileStoreError::Io {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => parent,
            None => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(io_error)?;

        let json = serde_json::to_vec_pretty(values).map_err(|source| FileStoreError::Format {
            path: self.path.clone(),
            source,
        })?;

        // Staged under a unique name beside the target, then renamed over it.
        let mut staging = NamedTempFile::new_in(dir).map_err(io_error)?;
        staging.write_all(&json).map_err(io_error)?;
        staging
            .persist(&self.path)
            .map_err(|e| io_error(e.error))?;
        Ok(())
    }
}

impl FlagStore for FileFlagStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        let mut updated = values.clone();
        updated.insert(key.to_string(), value.to_string());

        self.persist(&updated)?;
        *values = updated;
        log::trace!("Persisted flag '{key}' = '{value}'.");
        Ok(())
    }
}
