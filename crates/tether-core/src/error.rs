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

//! Defines the error types raised by the core contracts.

use crate::worker::RequestId;
use std::fmt;

/// An error raised while registering or awaiting a correlated response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrelationError {
    /// A waiter is already registered for this outstanding id.
    DoubleRegistration(RequestId),
    /// The registry was dropped while the waiter was still pending.
    RegistryDropped(RequestId),
}

impl fmt::Display for CorrelationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrelationError::DoubleRegistration(id) => {
                write!(f, "A waiter is already registered for request id {id}")
            }
            CorrelationError::RegistryDropped(id) => {
                write!(f, "Correlation registry dropped while request {id} was pending")
            }
        }
    }
}

impl std::error::Error for CorrelationError {}

/// An error raised when posting a message to a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The worker side of the channel is gone (terminated, crashed or exited).
    Disconnected,
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::Disconnected => write!(f, "Worker channel is disconnected"),
        }
    }
}

impl std::error::Error for ChannelError {}

/// An error raised when a new worker cannot be started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpawnError {
    /// No worker body is known under the requested entry name.
    UnknownEntry(String),
    /// The platform refused to start the execution unit.
    Os(String),
}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpawnError::UnknownEntry(entry) => write!(f, "Unknown worker entry '{entry}'"),
            SpawnError::Os(details) => write!(f, "Failed to spawn worker: {details}"),
        }
    }
}

impl std::error::Error for SpawnError {}

/// An error raised by a persisted flag store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The backing medium could not be read or written.
    Io(String),
    /// The persisted data exists but could not be decoded.
    Format(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(msg) => write!(f, "Storage I/O error: {msg}"),
            StorageError::Format(msg) => write!(f, "Storage format error: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}
