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

use super::message::{HostMessage, WorkerEvent};
use crate::error::{ChannelError, SpawnError};

/// The host side of a bidirectional message channel to one worker.
///
/// Events are delivered in the order the worker produced them. The event
/// stream ends (the receiver disconnects) once the worker is gone.
pub trait WorkerChannel: Send + Sync {
    /// Posts a message to the worker.
    fn send(&self, message: HostMessage) -> Result<(), ChannelError>;

    /// Returns the receiving end of the worker's messages and errors.
    ///
    /// Every call returns a handle to the same underlying queue, so an event
    /// is observed by exactly one consumer.
    fn events(&self) -> flume::Receiver<WorkerEvent>;

    /// Asks the worker to stop. Messages posted afterwards are rejected.
    fn terminate(&self);
}

/// The capability to start a new isolated worker.
///
/// A concrete implementation lives in `tether-infra` and typically maps
/// `entry` to a registered worker body.
pub trait WorkerSpawner: Send + Sync {
    /// Starts a new worker running `entry` and returns the channel to it.
    fn spawn(&self, entry: &str) -> Result<Box<dyn WorkerChannel>, SpawnError>;
}
