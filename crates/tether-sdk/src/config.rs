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

//! Bridge configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tether_core::{FlagStore, StorageError};
use tether_infra::{FileFlagStore, MemoryFlagStore};
use tether_io::DEFAULT_RESOURCE_ENTRY;
use tether_telemetry::DEFAULT_CAPACITY;
use thiserror::Error;

/// Errors raised while reading a [`BridgeConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The content is not a valid configuration.
    #[error("invalid bridge config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Configuration for a [`crate::Bridge`].
///
/// Every field has a default, so `{}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Lines kept per suppressed period before the oldest are dropped.
    pub output_capacity: usize,
    /// Where the output toggle is persisted. In memory when absent.
    pub flag_store_path: Option<PathBuf>,
    /// Worker entry spawned for each resource load.
    pub resource_worker_entry: String,
    /// Logger filter used when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            output_capacity: DEFAULT_CAPACITY,
            flag_store_path: None,
            resource_worker_entry: DEFAULT_RESOURCE_ENTRY.to_string(),
            log_filter: "info".to_string(),
        }
    }
}

impl BridgeConfig {
    /// Load the configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load the configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Builds the flag store this configuration names.
    pub fn open_flag_store(&self) -> Result<Arc<dyn FlagStore>, StorageError> {
        Ok(match &self.flag_store_path {
            Some(path) => Arc::new(FileFlagStore::open(path)?),
            None => Arc::new(MemoryFlagStore::new()),
        })
    }
}
