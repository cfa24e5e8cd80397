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

//! # Tether IO
//!
//! Loading services of the bridge:
//!
//! - [`ResourceLoader`] performs one-shot resource loads on dedicated workers.
//! - [`ScriptLoader`] loads executable code through whichever primitive the
//!   current [`ExecutionContext`] provides.

pub mod resource;
pub mod script;

pub use resource::{LoadError, ResourceLoader, DEFAULT_RESOURCE_ENTRY};
pub use script::{
    Capabilities, DynamicImport, ExecutionContext, ImportScripts, ScriptError, ScriptLoader,
};
