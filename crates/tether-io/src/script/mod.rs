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

//! Loading executable code over two possible execution contexts.
//!
//! Which primitive is used is decided once, when the [`ExecutionContext`] is
//! resolved, never per call.

mod context;

pub use self::context::{Capabilities, DynamicImport, ExecutionContext, ImportScripts};

use thiserror::Error;

/// Why executable code could not be loaded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// The execution context offers no loading primitive.
    #[error("no primitive for loading executable code is available in this execution context")]
    CapabilityMissing,
    /// The reference cannot name any loadable code.
    #[error("malformed executable reference '{0}'")]
    MalformedReference(String),
    /// The primitive failed to load the code.
    #[error("failed to load '{reference}': {details}")]
    Load {
        /// The reference that failed.
        reference: String,
        /// What went wrong.
        details: String,
    },
}

/// Loads executable code through the primitive of its [`ExecutionContext`].
#[derive(Debug, Clone)]
pub struct ScriptLoader {
    context: ExecutionContext,
}

impl ScriptLoader {
    /// Creates a loader bound to `context`.
    pub fn new(context: ExecutionContext) -> Self {
        Self { context }
    }

    /// The context this loader was resolved for.
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Loads `reference`, resolving once loading completes.
    ///
    /// Exactly one primitive runs per call. Its failure is propagated as is.
    pub async fn load_executable(&self, reference: &str) -> Result<(), ScriptError> {
        if reference.trim().is_empty() || reference.chars().any(char::is_control) {
            return Err(ScriptError::MalformedReference(reference.to_string()));
        }

        log::debug!(
            "Loading executable '{reference}' in the {} context.",
            self.context.name()
        );
        match &self.context {
            ExecutionContext::Worker(primitive) => primitive.import_scripts(reference).await,
            ExecutionContext::Main(primitive) => primitive.import(reference).await,
            ExecutionContext::Bare => Err(ScriptError::CapabilityMissing),
        }
    }
}
