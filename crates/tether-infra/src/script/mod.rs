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

//! Filesystem-backed primitives for loading executable code.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tether_io::{DynamicImport, ImportScripts, ScriptError};

/// Code loaded so far, keyed by reference. Shared between primitives.
#[derive(Debug, Clone, Default)]
pub struct ModuleTable {
    modules: Arc<RwLock<HashMap<String, Arc<[u8]>>>>,
}

impl ModuleTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `code` under `reference`, replacing any earlier entry.
    pub fn insert(&self, reference: impl Into<String>, code: impl Into<Arc<[u8]>>) {
        self.modules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(reference.into(), code.into());
    }

    /// The code loaded under `reference`.
    pub fn get(&self, reference: &str) -> Option<Arc<[u8]>> {
        self.modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(reference)
            .cloned()
    }

    /// Whether `reference` has been loaded.
    pub fn contains(&self, reference: &str) -> bool {
        self.modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(reference)
    }

    /// Number of loaded references.
    pub fn len(&self) -> usize {
        self.modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing has been loaded yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted references of everything loaded.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

/// Maps `reference` to a file under `root`.
///
/// Absolute references and references climbing out of `root` are rejected.
fn resolve_under(root: &Path, reference: &str) -> Result<PathBuf, ScriptError> {
    let relative = Path::new(reference);
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(ScriptError::MalformedReference(reference.to_string()));
    }
    Ok(root.join(relative))
}

fn load_failure(reference: &str, e: std::io::Error) -> ScriptError {
    ScriptError::Load {
        reference: reference.to_string(),
        details: e.to_string(),
    }
}

/// The dynamic-import primitive of the main context.
///
/// Modules are imported at most once; importing an already loaded reference
/// resolves immediately.
#[derive(Debug, Clone)]
pub struct FsModuleImporter {
    root: PathBuf,
    table: ModuleTable,
}

impl FsModuleImporter {
    /// Imports modules found under `root` into `table`.
    pub fn new(root: impl Into<PathBuf>, table: ModuleTable) -> Self {
        Self {
            root: root.into(),
            table,
        }
    }

    /// The table loaded code is recorded in.
    pub fn table(&self) -> &ModuleTable {
        &self.table
    }
}

#[async_trait]
impl DynamicImport for FsModuleImporter {
    async fn import(&self, reference: &str) -> Result<(), ScriptError> {
        if self.table.contains(reference) {
            log::trace!("Module '{reference}' already imported.");
            return Ok(());
        }

        let path = resolve_under(&self.root, reference)?;
        let code = tokio::fs::read(&path)
            .await
            .map_err(|e| load_failure(reference, e))?;
        log::debug!("Imported module '{reference}' ({} bytes).", code.len());
        self.table.insert(reference, code);
        Ok(())
    }
}

/// The "load into this worker" primitive.
///
/// Every call evaluates the file again, so repeated loads re-read it.
#[derive(Debug, Clone)]
pub struct WorkerScriptScope {
    root: PathBuf,
    table: ModuleTable,
}

impl WorkerScriptScope {
    /// Loads scripts found under `root` into `table`.
    pub fn new(root: impl Into<PathBuf>, table: ModuleTable) -> Self {
        Self {
            root: root.into(),
            table,
        }
    }

    /// The table loaded code is recorded in.
    pub fn table(&self) -> &ModuleTable {
        &self.table
    }
}

#[async_trait]
impl ImportScripts for WorkerScriptScope {
    async fn import_scripts(&self, reference: &str) -> Result<(), ScriptError> {
        let path = resolve_under(&self.root, reference)?;
        let code = tokio::fs::read(&path)
            .await
            .map_err(|e| load_failure(reference, e))?;
        log::debug!("Loaded script '{reference}' ({} bytes).", code.len());
        self.table.insert(reference, code);
        Ok(())
    }
}
