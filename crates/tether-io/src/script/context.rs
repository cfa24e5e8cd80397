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

use super::ScriptError;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

/// Loads executable code into the worker the caller runs on.
#[async_trait]
pub trait ImportScripts: Send + Sync + Debug {
    /// Loads `reference` into the current worker.
    async fn import_scripts(&self, reference: &str) -> Result<(), ScriptError>;
}

/// Loads executable code as a dynamically imported module.
#[async_trait]
pub trait DynamicImport: Send + Sync + Debug {
    /// Imports the module at `reference`.
    async fn import(&self, reference: &str) -> Result<(), ScriptError>;
}

/// The loading primitives an execution context exposes.
#[derive(Debug, Clone, Default)]
pub struct Capabilities {
    /// The "load into this worker" primitive, if available.
    pub import_scripts: Option<Arc<dyn ImportScripts>>,
    /// The dynamic module-import primitive, if available.
    pub dynamic_import: Option<Arc<dyn DynamicImport>>,
}

impl Capabilities {
    /// No primitive at all.
    pub fn none() -> Self {
        Self::default()
    }

    /// Adds the worker-scope primitive.
    pub fn with_import_scripts(mut self, primitive: Arc<dyn ImportScripts>) -> Self {
        self.import_scripts = Some(primitive);
        self
    }

    /// Adds the dynamic-import primitive.
    pub fn with_dynamic_import(mut self, primitive: Arc<dyn DynamicImport>) -> Self {
        self.dynamic_import = Some(primitive);
        self
    }
}

/// Where executable code gets loaded, decided once at startup.
#[derive(Debug, Clone)]
pub enum ExecutionContext {
    /// Running inside a worker: code is loaded into the worker scope.
    Worker(Arc<dyn ImportScripts>),
    /// Running on the main context: code is loaded by dynamic import.
    Main(Arc<dyn DynamicImport>),
    /// Neither primitive exists.
    Bare,
}

impl ExecutionContext {
    /// Picks the variant matching `capabilities`.
    ///
    /// The worker primitive wins when both are present.
    pub fn resolve(capabilities: Capabilities) -> Self {
        let context = match capabilities {
            Capabilities {
                import_scripts: Some(primitive),
                ..
            } => ExecutionContext::Worker(primitive),
            Capabilities {
                dynamic_import: Some(primitive),
                ..
            } => ExecutionContext::Main(primitive),
            _ => ExecutionContext::Bare,
        };
        log::debug!("Resolved execution context: {}", context.name());
        context
    }

    /// Short name of the variant.
    pub fn name(&self) -> &'static str {
        match self {
            ExecutionContext::Worker(_) => "worker",
            ExecutionContext::Main(_) => "main",
            ExecutionContext::Bare => "bare",
        }
    }
}
