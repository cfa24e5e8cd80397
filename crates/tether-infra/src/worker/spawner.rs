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

use super::resource::resource_loader_body;
use super::scope::WorkerScope;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread;
use tether_core::{
    ChannelError, HostMessage, SpawnError, ThreadId, WorkerChannel, WorkerEvent, WorkerSpawner,
};
use tether_io::DEFAULT_RESOURCE_ENTRY;

/// The code a thread-backed worker runs.
///
/// Returning an error, or panicking, surfaces as a [`WorkerEvent::Error`].
pub type WorkerBody = Arc<dyn Fn(WorkerScope) -> anyhow::Result<()> + Send + Sync>;

/// Spawns workers as OS threads running registered [`WorkerBody`]s.
///
/// Thread ids start at `1`; `0` is left to the coordinating thread.
pub struct ThreadWorkerSpawner {
    bodies: RwLock<HashMap<String, WorkerBody>>,
    next_thread_id: AtomicU32,
}

impl ThreadWorkerSpawner {
    /// Creates a spawner with no registered entries.
    pub fn new() -> Self {
        Self {
            bodies: RwLock::new(HashMap::new()),
            next_thread_id: AtomicU32::new(1),
        }
    }

    /// Creates a spawner with [`resource_loader_body`] registered under
    /// [`DEFAULT_RESOURCE_ENTRY`].
    pub fn with_resource_loader() -> Self {
        let spawner = Self::new();
        spawner.register(DEFAULT_RESOURCE_ENTRY, resource_loader_body);
        spawner
    }

    /// Registers `body` under `entry`, replacing any previous body.
    pub fn register<F>(&self, entry: impl Into<String>, body: F)
    where
        F: Fn(WorkerScope) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let entry = entry.into();
        log::debug!("Registered worker entry '{entry}'.");
        self.bodies
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(entry, Arc::new(body));
    }

    /// Names of every registered entry.
    pub fn entries(&self) -> Vec<String> {
        let mut entries: Vec<_> = self
            .bodies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        entries.sort();
        entries
    }
}

impl Default for ThreadWorkerSpawner {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerSpawner for ThreadWorkerSpawner {
    fn spawn(&self, entry: &str) -> Result<Box<dyn WorkerChannel>, SpawnError> {
        let body = self
            .bodies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(entry)
            .cloned()
            .ok_or_else(|| SpawnError::UnknownEntry(entry.to_string()))?;

        let thread_id = self.next_thread_id.fetch_add(1, Ordering::Relaxed);
        let (host_sender, host_receiver) = flume::unbounded();
        let (event_sender, event_receiver) = flume::unbounded();
        let scope = WorkerScope::new(thread_id, host_receiver, event_sender.clone());

        thread::Builder::new()
            .name(format!("tether-{entry}-{thread_id}"))
            .spawn(move || run_body(thread_id, body, scope, event_sender))
            .map_err(|e| SpawnError::Os(e.to_string()))?;

        log::debug!("Spawned worker '{entry}' on thread {thread_id}.");
        Ok(Box::new(ThreadChannel {
            thread_id,
            sender: Mutex::new(Some(host_sender)),
            events: event_receiver,
        }))
    }
}

fn run_body(
    thread_id: ThreadId,
    body: WorkerBody,
    scope: WorkerScope,
    events: flume::Sender<WorkerEvent>,
) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(scope)));
    let failure = match outcome {
        Ok(Ok(())) => return,
        Ok(Err(e)) => format!("{e:#}"),
        Err(payload) => format!("worker panicked: {}", panic_message(payload.as_ref())),
    };

    log::debug!("Worker thread {thread_id} failed: {failure}");
    // The host may already have terminated the channel.
    let _ = events.send(WorkerEvent::Error(failure));
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Host side of a thread-backed worker.
struct ThreadChannel {
    thread_id: ThreadId,
    sender: Mutex<Option<flume::Sender<HostMessage>>>,
    events: flume::Receiver<WorkerEvent>,
}

impl WorkerChannel for ThreadChannel {
    fn send(&self, message: HostMessage) -> Result<(), ChannelError> {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        match sender.as_ref() {
            Some(sender) => sender
                .send(message)
                .map_err(|_| ChannelError::Disconnected),
            None => Err(ChannelError::Disconnected),
        }
    }

    fn events(&self) -> flume::Receiver<WorkerEvent> {
        self.events.clone()
    }

    fn terminate(&self) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(sender) = sender {
            let _ = sender.send(HostMessage::Shutdown);
            log::trace!("Terminated worker thread {}.", self.thread_id);
        }
    }
}
