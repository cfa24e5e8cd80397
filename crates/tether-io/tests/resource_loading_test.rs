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

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tether_core::{
    ChannelError, FlagStore, HostMessage, ResourceDescriptor, SpawnError, StorageError,
    WorkerChannel, WorkerEvent, WorkerMessage, WorkerSpawner,
};
use tether_io::{LoadError, ResourceLoader, DEFAULT_RESOURCE_ENTRY};
use tether_telemetry::{LogLine, MemorySink, OutputMultiplexer};

/// A spawner whose workers replay a fixed list of events once they receive a load.
#[derive(Default)]
struct ScriptedSpawner {
    script: Vec<WorkerEvent>,
    close_after_script: bool,
    known_entry: Option<String>,
    spawned: Arc<Mutex<Vec<String>>>,
    terminated: Arc<AtomicUsize>,
}

impl ScriptedSpawner {
    fn replying(script: Vec<WorkerEvent>) -> Self {
        Self {
            script,
            ..Default::default()
        }
    }

    fn spawn_count(&self) -> usize {
        self.spawned.lock().unwrap().len()
    }
}

struct ScriptedChannel {
    sender: Mutex<Option<flume::Sender<WorkerEvent>>>,
    receiver: flume::Receiver<WorkerEvent>,
    script: Vec<WorkerEvent>,
    close_after_script: bool,
    terminated: Arc<AtomicUsize>,
}

impl WorkerSpawner for ScriptedSpawner {
    fn spawn(&self, entry: &str) -> Result<Box<dyn WorkerChannel>, SpawnError> {
        if let Some(known) = &self.known_entry {
            if known != entry {
                return Err(SpawnError::UnknownEntry(entry.to_string()));
            }
        }
        self.spawned.lock().unwrap().push(entry.to_string());

        let (sender, receiver) = flume::unbounded();
        Ok(Box::new(ScriptedChannel {
            sender: Mutex::new(Some(sender)),
            receiver,
            script: self.script.clone(),
            close_after_script: self.close_after_script,
            terminated: self.terminated.clone(),
        }))
    }
}

impl WorkerChannel for ScriptedChannel {
    fn send(&self, message: HostMessage) -> Result<(), ChannelError> {
        let mut guard = self.sender.lock().unwrap();
        let sender = guard.as_ref().ok_or(ChannelError::Disconnected)?;

        if let HostMessage::LoadResource(descriptor) = message {
            descriptor.memory.store(descriptor.location.as_bytes().to_vec());
            for event in &self.script {
                sender.send(event.clone()).unwrap();
            }
            if self.close_after_script {
                guard.take();
            }
        }
        Ok(())
    }

    fn events(&self) -> flume::Receiver<WorkerEvent> {
        self.receiver.clone()
    }

    fn terminate(&self) {
        self.sender.lock().unwrap().take();
        self.terminated.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
struct MapStore(Mutex<HashMap<String, String>>);

impl FlagStore for MapStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.0.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.0
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

fn message(message: WorkerMessage) -> WorkerEvent {
    WorkerEvent::Message(message)
}

#[tokio::test]
async fn test_success_signal_resolves_load() {
    let spawner = Arc::new(ScriptedSpawner::replying(vec![message(
        WorkerMessage::LoadComplete,
    )]));
    let loader = ResourceLoader::new(spawner.clone());

    let descriptor = ResourceDescriptor::new("font", "fonts/NotoSans.ttf");
    let memory = descriptor.memory.clone();

    loader.load(descriptor).await.expect("load should succeed");

    assert_eq!(memory.to_vec(), b"fonts/NotoSans.ttf".to_vec());
    assert_eq!(spawner.spawn_count(), 1);
    assert_eq!(spawner.terminated.load(Ordering::SeqCst), 1);
    assert_eq!(spawner.spawned.lock().unwrap()[0], DEFAULT_RESOURCE_ENTRY);
}

#[tokio::test]
async fn test_error_signal_rejects_with_reported_error() {
    let spawner = Arc::new(ScriptedSpawner::replying(vec![
        message(WorkerMessage::LoadError {
            error: "bad format".to_string(),
        }),
        message(WorkerMessage::LoadComplete),
    ]));
    let loader = ResourceLoader::new(spawner.clone());

    let err = loader
        .load(ResourceDescriptor::new("resourceA", "a.bin"))
        .await
        .unwrap_err();

    assert_eq!(err, LoadError::Failed("bad format".to_string()));
    assert_eq!(err.to_string(), "bad format");
    assert_eq!(spawner.terminated.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_first_signal_wins_over_later_error() {
    let spawner = Arc::new(ScriptedSpawner::replying(vec![
        message(WorkerMessage::LoadComplete),
        message(WorkerMessage::LoadError {
            error: "too late".to_string(),
        }),
    ]));
    let loader = ResourceLoader::new(spawner);

    assert!(loader
        .load(ResourceDescriptor::new("font", "f.ttf"))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_worker_error_event_rejects() {
    let spawner = Arc::new(ScriptedSpawner::replying(vec![WorkerEvent::Error(
        "panicked".to_string(),
    )]));
    let loader = ResourceLoader::new(spawner);

    let err = loader
        .load(ResourceDescriptor::new("font", "f.ttf"))
        .await
        .unwrap_err();
    assert_eq!(err, LoadError::WorkerCrashed("panicked".to_string()));
}

#[tokio::test]
async fn test_silent_exit_rejects() {
    let spawner = Arc::new(ScriptedSpawner {
        close_after_script: true,
        ..Default::default()
    });
    let loader = ResourceLoader::new(spawner);

    let err = loader
        .load(ResourceDescriptor::new("font", "f.ttf"))
        .await
        .unwrap_err();
    assert_eq!(err, LoadError::WorkerExited);
}

#[tokio::test]
async fn test_spawn_failure_is_reported() {
    let spawner = Arc::new(ScriptedSpawner {
        known_entry: Some("something-else".to_string()),
        ..Default::default()
    });
    let loader = ResourceLoader::new(spawner);

    let err = loader
        .load(ResourceDescriptor::new("font", "f.ttf"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        LoadError::Spawn(SpawnError::UnknownEntry(DEFAULT_RESOURCE_ENTRY.to_string()))
    );
}

#[tokio::test]
async fn test_custom_entry_is_spawned() {
    let spawner = Arc::new(ScriptedSpawner {
        script: vec![message(WorkerMessage::LoadComplete)],
        known_entry: Some("font-loader".to_string()),
        ..Default::default()
    });
    let loader = ResourceLoader::new(spawner.clone()).with_entry("font-loader");
    assert_eq!(loader.entry(), "font-loader");

    loader
        .load(ResourceDescriptor::new("font", "f.ttf"))
        .await
        .unwrap();
    assert_eq!(spawner.spawned.lock().unwrap().as_slice(), ["font-loader"]);
}

#[tokio::test]
async fn test_concurrent_loads_use_separate_workers() {
    let spawner = Arc::new(ScriptedSpawner::replying(vec![message(
        WorkerMessage::LoadComplete,
    )]));
    let loader = ResourceLoader::new(spawner.clone());

    let (a, b) = tokio::join!(
        loader.load(ResourceDescriptor::new("a", "a.bin")),
        loader.load(ResourceDescriptor::new("b", "b.bin")),
    );

    assert!(a.is_ok() && b.is_ok());
    assert_eq!(spawner.spawn_count(), 2);
    assert_eq!(spawner.terminated.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_loader_log_lines_reach_the_multiplexer() -> anyhow::Result<()> {
    let spawner = Arc::new(ScriptedSpawner::replying(vec![
        message(WorkerMessage::Log {
            thread_id: 4,
            text: "decoding glyphs".to_string(),
        }),
        message(WorkerMessage::LoadComplete),
    ]));
    let output = Arc::new(OutputMultiplexer::new(
        Arc::new(MapStore::default()),
        Arc::new(MemorySink::new()),
    ));
    let loader = ResourceLoader::new(spawner).with_output(output.clone());

    loader.load(ResourceDescriptor::new("font", "f.ttf")).await?;

    assert_eq!(output.buffered(), vec![LogLine::new(4, "decoding glyphs")]);
    Ok(())
}
