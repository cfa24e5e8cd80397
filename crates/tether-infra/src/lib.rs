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

//! # Tether Infra
//!
//! Concrete implementations of the collaborators the bridge consumes:
//!
//! - [`ThreadWorkerSpawner`]: workers backed by OS threads and `flume` channels,
//! - [`FileFlagStore`] / [`MemoryFlagStore`]: persisted flag stores,
//! - [`FsModuleImporter`] / [`WorkerScriptScope`]: filesystem-backed
//!   executable-loading primitives.

pub mod script;
pub mod storage;
pub mod worker;

pub use script::{FsModuleImporter, ModuleTable, WorkerScriptScope};
pub use storage::{FileFlagStore, MemoryFlagStore};
pub use worker::{resource_loader_body, ThreadWorkerSpawner, WorkerBody, WorkerScope};
