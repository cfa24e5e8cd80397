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

//! # Tether Core
//!
//! Foundational crate containing the wire messages, worker contracts and the
//! correlation registry shared by every layer of the bridge.
//!
//! Nothing in this crate spawns threads or touches the filesystem: concrete
//! collaborators live in `tether-infra`.

#![warn(missing_docs)]

pub mod correlation;
pub mod error;
pub mod storage;
pub mod worker;

pub use correlation::{CorrelationRegistry, PendingResponse};
pub use error::{ChannelError, CorrelationError, SpawnError, StorageError};
pub use storage::FlagStore;
pub use worker::{
    CorrelatedMessage, HostMessage, ModuleHandle, RequestId, ResourceDescriptor, SharedMemory,
    ThreadId, WorkerChannel, WorkerEvent, WorkerMessage, WorkerSpawner,
};
