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

//! The [`Bridge`] and the handles of the workers it spawns.

use crate::config::BridgeConfig;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tether_core::{
    ChannelError, CorrelatedMessage, CorrelationError, CorrelationRegistry, FlagStore,
    HostMessage, RequestId, ResourceDescriptor, SpawnError, StorageError, WorkerChannel,
    WorkerEvent, WorkerMessage, WorkerSpawner,
};
use tether_infra::ThreadWorkerSpawner;
use tether_io::{ExecutionContext, LoadError, ResourceLoader, ScriptError, ScriptLoader};
use tether_telemetry::{DiagnosticSink, LogSink, OutputMode, OutputMultiplexer};
use thiserror::Error;
use tokio::task::JoinHandle;

/// Errors surfaced by [`Bridge`] operations on workers.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The response could not be awaited.
    #[error(transparent)]
    Correlation(#[from] CorrelationError),
    /// The worker is no longer reachable.
    #[error(transparent)]
    Channel(#[from] ChannelError),
    /// The worker could not be started.
    #[error(transparent)]
    Spawn(#[from] SpawnError),
    /// The configured flag store could not be opened.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// [`Bridge::spawn_worker`] was called outside a tokio runtime.
    #[error("workers can only be started from within a tokio runtime")]
    NoRuntime,
}

/// Answers requests a worker sends to the coordinating process.
///
/// Without a handler, requests are queued on the worker's
/// [`WorkerHandle`] and answered with [`Bridge::respond`].
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Produces the payload of the response to `request`.
    async fn handle(&self, entry: &str, request: &CorrelatedMessage) -> Value;
}

/// A running worker spawned through a [`Bridge`].
///
/// Dropping the handle terminates the worker.
pub struct WorkerHandle {
    entry: String,
    channel: Arc<dyn WorkerChannel>,
    requests: flume::Receiver<CorrelatedMessage>,
    pump: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// The entry this worker was spawned from.
    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Posts a raw message to the worker.
    pub fn send(&self, message: HostMessage) -> Result<(), ChannelError> {
        self.channel.send(message)
    }

    /// Waits for the next request this worker sent that no
    /// [`RequestHandler`] answered.
    ///
    /// Returns `None` once the worker's event stream has closed and every
    /// queued request was taken.
    pub async fn next_request(&self) -> Option<CorrelatedMessage> {
        self.requests.recv_async().await.ok()
    }

    /// Asks the worker to stop and waits until every event it posted has
    /// been processed.
    pub async fn shutdown(mut self) {
        self.channel.terminate();
        if let Some(pump) = self.pump.take() {
            if let Err(e) = pump.await {
                log::warn!("Event pump of worker '{}' ended abnormally: {e}", self.entry);
            }
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.channel.terminate();
    }
}

/// The coordinating side of the runtime bridge.
pub struct Bridge {
    registry: CorrelationRegistry,
    output: Arc<OutputMultiplexer>,
    resources: ResourceLoader,
    scripts: ScriptLoader,
    spawner: Arc<dyn WorkerSpawner>,
    handler: Option<Arc<dyn RequestHandler>>,
}

impl Bridge {
    /// Creates a bridge writing worker output through the `log` facade.
    ///
    /// ## Arguments
    /// * `config` - capacities and worker entries.
    /// * `spawner` - starts workers, including the per-load resource workers.
    /// * `store` - where the output toggle is persisted.
    /// * `context` - the execution context executable code is loaded into.
    pub fn new(
        config: &BridgeConfig,
        spawner: Arc<dyn WorkerSpawner>,
        store: Arc<dyn FlagStore>,
        context: ExecutionContext,
    ) -> Self {
        Self::with_sink(config, spawner, store, Arc::new(LogSink), context)
    }

    /// Like [`Bridge::new`], writing worker output to `sink`.
    pub fn with_sink(
        config: &BridgeConfig,
        spawner: Arc<dyn WorkerSpawner>,
        store: Arc<dyn FlagStore>,
        sink: Arc<dyn DiagnosticSink>,
        context: ExecutionContext,
    ) -> Self {
        let output = Arc::new(OutputMultiplexer::with_capacity(
            store,
            sink,
            config.output_capacity,
        ));
        let resources = ResourceLoader::new(spawner.clone())
            .with_entry(config.resource_worker_entry.clone())
            .with_output(output.clone());

        Self {
            registry: CorrelationRegistry::new(),
            output,
            resources,
            scripts: ScriptLoader::new(context),
            spawner,
            handler: None,
        }
    }

    /// Builds a bridge from `config` alone: installs the logger, opens the
    /// configured flag store and uses thread-backed workers.
    pub fn from_config(
        config: &BridgeConfig,
        context: ExecutionContext,
    ) -> Result<Self, BridgeError> {
        tether_telemetry::init_logging(&config.log_filter);
        let store = config.open_flag_store()?;
        let spawner = Arc::new(ThreadWorkerSpawner::with_resource_loader());
        Ok(Self::new(config, spawner, store, context))
    }

    /// Installs the handler answering worker-originated requests.
    pub fn with_request_handler(mut self, handler: Arc<dyn RequestHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// The registry correlating this bridge's requests.
    pub fn registry(&self) -> &CorrelationRegistry {
        &self.registry
    }

    /// The multiplexer receiving every worker's log lines.
    pub fn output(&self) -> &OutputMultiplexer {
        &self.output
    }

    /// Spawns a worker from `entry` and starts processing its events.
    ///
    /// Events of one worker are handled strictly in the order it posted them.
    /// Must be called from within a tokio runtime.
    pub fn spawn_worker(&self, entry: &str) -> Result<WorkerHandle, BridgeError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| BridgeError::NoRuntime)?;
        let channel: Arc<dyn WorkerChannel> = Arc::from(self.spawner.spawn(entry)?);
        let (unanswered, requests) = flume::unbounded();

        let pump = EventPump {
            entry: entry.to_string(),
            channel: channel.clone(),
            registry: self.registry.clone(),
            output: self.output.clone(),
            handler: self.handler.clone(),
            unanswered,
        };
        let pump = runtime.spawn(pump.run());

        log::info!("Worker '{entry}' started.");
        Ok(WorkerHandle {
            entry: entry.to_string(),
            channel,
            requests,
            pump: Some(pump),
        })
    }

    /// Sends `payload` to `worker` and waits for the correlated response.
    ///
    /// The wait is registered before the request leaves, so even an
    /// immediate answer is observed.
    pub async fn request(
        &self,
        worker: &WorkerHandle,
        payload: Value,
    ) -> Result<CorrelatedMessage, BridgeError> {
        let id = self.registry.next_id();
        let pending = self.registry.wait_for(id)?;
        worker.send(HostMessage::Request(CorrelatedMessage::new(id, payload)))?;
        log::trace!("Request {id} sent to worker '{}'.", worker.entry());
        Ok(pending.await?)
    }

    /// Answers the worker-originated request `id`, as taken from
    /// [`WorkerHandle::next_request`].
    pub fn respond(
        &self,
        worker: &WorkerHandle,
        id: RequestId,
        payload: Value,
    ) -> Result<(), BridgeError> {
        worker.send(HostMessage::Response(CorrelatedMessage::new(id, payload)))?;
        Ok(())
    }

    /// Loads a resource on a dedicated worker.
    pub async fn load_resource(&self, descriptor: ResourceDescriptor) -> Result<(), LoadError> {
        self.resources.load(descriptor).await
    }

    /// Loads executable code through the resolved execution context.
    pub async fn load_executable(&self, reference: &str) -> Result<(), ScriptError> {
        self.scripts.load_executable(reference).await
    }

    /// Flips and persists the output mode, returning the new one.
    pub fn toggle_output(&self) -> Result<OutputMode, StorageError> {
        self.output.toggle()
    }

    /// The current output mode.
    pub fn output_mode(&self) -> OutputMode {
        self.output.mode()
    }
}

struct EventPump {
    entry: String,
    channel: Arc<dyn WorkerChannel>,
    registry: CorrelationRegistry,
    output: Arc<OutputMultiplexer>,
    handler: Option<Arc<dyn RequestHandler>>,
    unanswered: flume::Sender<CorrelatedMessage>,
}

impl EventPump {
    async fn run(self) {
        let events = self.channel.events();
        while let Ok(event) = events.recv_async().await {
            match event {
                WorkerEvent::Message(message) => self.dispatch(message).await,
                WorkerEvent::Error(details) => {
                    log::error!("Worker '{}' failed: {details}", self.entry);
                }
            }
        }
        log::debug!("Worker '{}' closed its event stream.", self.entry);
    }

    async fn dispatch(&self, message: WorkerMessage) {
        match message {
            WorkerMessage::Response { id, payload } => {
                self.registry.deliver(CorrelatedMessage::new(id, payload));
            }
            WorkerMessage::Log { thread_id, text } => self.output.emit(thread_id, text),
            WorkerMessage::Request { id, payload } => {
                let request = CorrelatedMessage::new(id, payload);
                let Some(handler) = &self.handler else {
                    log::trace!("Queued request {id} of worker '{}'.", self.entry);
                    if self.unanswered.send(request).is_err() {
                        log::warn!(
                            "Worker '{}' sent request {id} but its handle is gone.",
                            self.entry
                        );
                    }
                    return;
                };
                let answer = handler.handle(&self.entry, &request).await;
                let response = HostMessage::Response(CorrelatedMessage::new(id, answer));
                if let Err(e) = self.channel.send(response) {
                    log::warn!("Could not answer request {id} of '{}': {e}", self.entry);
                }
            }
            stray @ (WorkerMessage::LoadComplete | WorkerMessage::LoadError { .. }) => {
                log::debug!(
                    "Ignoring stray '{}' signal from worker '{}'.",
                    stray.kind(),
                    self.entry
                );
            }
        }
    }
}
