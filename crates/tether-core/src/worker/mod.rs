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

//! Worker-facing contracts.
//!
//! A worker is an isolated, concurrently-executing unit that talks to the
//! coordinating process only through messages. This module defines:
//!
//! - the messages exchanged in both directions ([`WorkerMessage`], [`HostMessage`]),
//! - the handles a resource load hands over to a worker ([`SharedMemory`], [`ModuleHandle`]),
//! - the spawn/channel capability the bridge consumes ([`WorkerSpawner`], [`WorkerChannel`]).

mod channel;
mod memory;
mod message;

pub use self::channel::{WorkerChannel, WorkerSpawner};
pub use self::memory::{ModuleHandle, SharedMemory};
pub use self::message::{
    CorrelatedMessage, HostMessage, RequestId, ResourceDescriptor, ThreadId, WorkerEvent,
    WorkerMessage,
};
