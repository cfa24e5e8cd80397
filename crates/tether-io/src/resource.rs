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

//! One-shot resource loading on dedicated workers.

use std::sync::Arc;
use tether_core::{
    ChannelError, HostMessage, ResourceDescriptor, SpawnError, WorkerChannel, WorkerEvent,
    WorkerMessage, WorkerSpawner,
};
use tether_telemetry::OutputMultiplexer;
use thiserror::Error;

/// Worker entry spawned for resource loads unless configured otherwise.
pub const DEFAULT_RESOURCE_ENTRY: &str = "resource-loader";

/// Why a resource load did not complete.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The dedicated worker could not be started.
    #[error("failed to spawn loader worker: {0}")]
    Spawn(#[from] SpawnError),
    /// The resource descriptor could not be handed to the worker.
    #[error("failed to hand the resource to its worker: {0}")]
    Send(#[from] ChannelError),
    /// The worker reported a load error.
    #[error("{0}")]
    Failed(String),
    /// The worker raised an error instead of reporting an outcome.
    #[error("loader worker crashed: {0}")]
    WorkerCrashed(String),
    /// The worker went away without reporting an outcome.
    #[error("loader worker exited before reporting an outcome")]
    WorkerExited,
}

/// Loads resources by spawning one dedicated worker per load.
///
/// Workers are never reused: each [`ResourceLoader::load`] call gets a fresh
/// worker, which is terminated as soon as the load settles.
pub struct ResourceLoader {
    spawner: Arc<dyn WorkerSpawner>,
    entry: String,
    output: Option<Arc<OutputMultiplexer>>,
}

impl ResourceLoader {
    /// Creates a loader spawning [`DEFAULT_RESOURCE_ENTRY`] workers.
    pub fn new(spawner: Arc<dyn WorkerSpawner>) -> Self {
        Self {
            spawner,
            entry: DEFAULT_RESOURCE_ENTRY.to_string(),
            output: None,
        }
    }

    /// Spawns `entry` workers instead of the default one.
    pub fn with_entry(mut self, entry: impl Into<String>) -> Self {
        self.entry = entry.into();
        self
    }

    /// Forwards log lines posted by loader workers to `output`.
    pub fn with_output(mut self, output: Arc<OutputMultiplexer>) -> Self {
        self.output = Some(output);
        self
    }

    /// The worker entry spawned for each load.
    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Loads `descriptor` on a new worker and waits for its outcome.
    ///
    /// Resolves exactly once: on the worker's first success or error signal.
    /// Anything the worker posts afterwards is never observed. The caller
    /// decides whether to retry; this method does not.
    pub async fn load(&self, descriptor: ResourceDescriptor) -> Result<(), LoadError> {
        log::debug!(
            "Spawning '{}' worker for resource '{}'.",
            self.entry,
            descriptor.name
        );
        let channel = self.spawner.spawn(&self.entry)?;
        let task = LoadTask {
            name: descriptor.name.clone(),
            channel,
        };

        let outcome = task.run(descriptor, self.output.as_deref()).await;
        match &outcome {
            Ok(()) => log::info!("Resource '{}' loaded.", task.name),
            Err(e) => log::warn!("Resource '{}' failed to load: {e}", task.name),
        }
        outcome
    }
}

/// One in-flight load bound to exactly one worker.
///
/// Dropping the task (including when the `load` future is cancelled)
/// terminates its worker.
struct LoadTask {
    name: String,
    channel: Box<dyn WorkerChannel>,
}

impl LoadTask {
    async fn run(
        &self,
        descriptor: ResourceDescriptor,
        output: Option<&OutputMultiplexer>,
    ) -> Result<(), LoadError> {
        let events = self.channel.events();
        self.channel.send(HostMessage::LoadResource(descriptor))?;

        loop {
            let Ok(event) = events.recv_async().await else {
                return Err(LoadError::WorkerExited);
            };

            match event {
                WorkerEvent::Message(WorkerMessage::LoadComplete) => return Ok(()),
                WorkerEvent::Message(WorkerMessage::LoadError { error }) => {
                    return Err(LoadError::Failed(error));
                }
                WorkerEvent::Error(details) => return Err(LoadError::WorkerCrashed(details)),
                WorkerEvent::Message(WorkerMessage::Log { thread_id, text }) => match output {
                    Some(output) => output.emit(thread_id, text),
                    None => log::debug!("[loader {}] {text}", self.name),
                },
                WorkerEvent::Message(other) => {
                    log::debug!(
                        "Ignoring '{}' message from the loader of '{}'.",
                        other.kind(),
                        self.name
                    );
                }
            }
        }
    }
}

impl Drop for LoadTask {
    fn drop(&mut self) {
        self.channel.terminate();
    }
}
