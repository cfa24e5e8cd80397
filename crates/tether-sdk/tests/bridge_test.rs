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

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::tempdir;
use tether_core::{CorrelatedMessage, RequestId, ResourceDescriptor, SharedMemory};
use tether_sdk::{
    Bridge, BridgeConfig, BridgeError, ExecutionContext, FileFlagStore, MemoryFlagStore,
    OutputMode, RequestHandler, ScriptError, ThreadWorkerSpawner, WorkerScope,
};
use tether_telemetry::MemorySink;

fn spawner() -> ThreadWorkerSpawner {
    let spawner = ThreadWorkerSpawner::with_resource_loader();
    spawner.register("echo", |mut scope: WorkerScope| {
        scope.serve(|request| json!({ "echo": request.payload.clone() }))?;
        Ok(())
    });
    spawner.register("chatty", |mut scope: WorkerScope| {
        for i in 0..3 {
            scope.log(format!("line {i}"))?;
        }
        scope.serve(|_| Value::Null)?;
        Ok(())
    });
    spawner.register("curious", |mut scope: WorkerScope| {
        let answer = scope.request(json!({ "question": "name" }))?;
        scope.log(format!("host says {}", answer.payload))?;
        scope.serve(|_| Value::Null)?;
        Ok(())
    });
    spawner.register("confused", |mut scope: WorkerScope| {
        scope.respond(RequestId(999), json!("nobody asked"))?;
        scope.serve(|request| request.payload.clone())?;
        Ok(())
    });
    spawner
}

fn bridge_with_sink(sink: Arc<MemorySink>) -> Bridge {
    Bridge::with_sink(
        &BridgeConfig::default(),
        Arc::new(spawner()),
        Arc::new(MemoryFlagStore::new()),
        sink,
        ExecutionContext::Bare,
    )
}

fn texts(lines: &[tether_telemetry::LogLine]) -> Vec<String> {
    lines.iter().map(|line| line.text().to_string()).collect()
}

#[tokio::test]
async fn test_request_round_trip() {
    let bridge = bridge_with_sink(Arc::new(MemorySink::new()));
    let worker = bridge.spawn_worker("echo").unwrap();

    let first = bridge.request(&worker, json!(1)).await.unwrap();
    let second = bridge.request(&worker, json!(2)).await.unwrap();

    assert_eq!(first.id, RequestId(0));
    assert_eq!(first.payload, json!({ "echo": 1 }));
    assert_eq!(second.id, RequestId(1));
    assert_eq!(second.payload, json!({ "echo": 2 }));
    assert_eq!(bridge.registry().pending_count(), 0);

    worker.shutdown().await;
}

#[tokio::test]
async fn test_worker_output_is_buffered_then_flushed() {
    let sink = Arc::new(MemorySink::new());
    let bridge = bridge_with_sink(sink.clone());
    let worker = bridge.spawn_worker("chatty").unwrap();

    // The answer is processed after the lines posted before it.
    bridge.request(&worker, Value::Null).await.unwrap();
    assert_eq!(bridge.output_mode(), OutputMode::Suppressed);
    assert!(sink.lines().is_empty());
    assert_eq!(texts(&bridge.output().buffered()), ["line 0", "line 1", "line 2"]);

    assert_eq!(bridge.toggle_output().unwrap(), OutputMode::Live);
    let flushed = sink.lines();
    assert_eq!(texts(&flushed), ["line 0", "line 1", "line 2"]);
    assert!(flushed.iter().all(|line| line.thread_id() == flushed[0].thread_id()));
    assert!(bridge.output().buffered().is_empty());

    worker.shutdown().await;
}

#[tokio::test]
async fn test_output_mode_survives_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("flags.json");

    let first = Bridge::new(
        &BridgeConfig::default(),
        Arc::new(spawner()),
        Arc::new(FileFlagStore::open(&path).unwrap()),
        ExecutionContext::Bare,
    );
    assert_eq!(first.output_mode(), OutputMode::Suppressed);
    first.toggle_output().unwrap();
    drop(first);

    let config = BridgeConfig {
        flag_store_path: Some(path),
        ..BridgeConfig::default()
    };
    let second = Bridge::from_config(&config, ExecutionContext::Bare).unwrap();
    assert_eq!(second.output_mode(), OutputMode::Live);
}

struct NameHandler;

#[async_trait]
impl RequestHandler for NameHandler {
    async fn handle(&self, entry: &str, request: &CorrelatedMessage) -> Value {
        assert_eq!(request.payload, json!({ "question": "name" }));
        json!(entry)
    }
}

#[tokio::test]
async fn test_worker_requests_reach_the_handler() {
    let sink = Arc::new(MemorySink::new());
    let bridge = bridge_with_sink(sink).with_request_handler(Arc::new(NameHandler));
    let worker = bridge.spawn_worker("curious").unwrap();

    // The worker only starts serving once its own request was answered.
    bridge.request(&worker, Value::Null).await.unwrap();
    assert_eq!(
        texts(&bridge.output().buffered()),
        [r#"host says "curious""#]
    );

    worker.shutdown().await;
}

#[tokio::test]
async fn test_unhandled_requests_are_answered_by_the_caller() {
    let bridge = bridge_with_sink(Arc::new(MemorySink::new()));
    let worker = bridge.spawn_worker("curious").unwrap();

    let request = worker.next_request().await.unwrap();
    assert_eq!(request.payload, json!({ "question": "name" }));
    bridge.respond(&worker, request.id, json!("host")).unwrap();

    // Served only after the worker got its answer.
    bridge.request(&worker, Value::Null).await.unwrap();
    assert_eq!(texts(&bridge.output().buffered()), [r#"host says "host""#]);

    worker.shutdown().await;
}

#[tokio::test]
async fn test_orphan_response_is_dropped() {
    let bridge = bridge_with_sink(Arc::new(MemorySink::new()));
    let worker = bridge.spawn_worker("confused").unwrap();

    let answer = bridge.request(&worker, json!("real")).await.unwrap();
    assert_eq!(answer.payload, json!("real"));
    assert_eq!(bridge.registry().pending_count(), 0);

    worker.shutdown().await;
}

#[tokio::test]
async fn test_resource_loading_through_the_bridge() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mesh.bin");
    std::fs::write(&path, b"vertices").unwrap();

    let bridge = bridge_with_sink(Arc::new(MemorySink::new()));
    let memory = SharedMemory::new();
    bridge
        .load_resource(
            ResourceDescriptor::new("mesh", path.to_string_lossy()).with_memory(memory.clone()),
        )
        .await
        .unwrap();
    assert_eq!(memory.to_vec(), b"vertices".to_vec());

    let missing = ResourceDescriptor::new("gone", dir.path().join("gone.bin").to_string_lossy());
    assert!(bridge.load_resource(missing).await.is_err());
}

#[tokio::test]
async fn test_bare_context_cannot_load_code() {
    let bridge = bridge_with_sink(Arc::new(MemorySink::new()));
    assert_eq!(
        bridge.load_executable("app.js").await,
        Err(ScriptError::CapabilityMissing)
    );
}

#[tokio::test]
async fn test_unknown_worker_entry() {
    let bridge = bridge_with_sink(Arc::new(MemorySink::new()));
    assert!(matches!(
        bridge.spawn_worker("nope"),
        Err(BridgeError::Spawn(_))
    ));
}

#[test]
fn test_spawning_needs_a_runtime() {
    let bridge = bridge_with_sink(Arc::new(MemorySink::new()));
    assert!(matches!(
        bridge.spawn_worker("echo"),
        Err(BridgeError::NoRuntime)
    ));
}
