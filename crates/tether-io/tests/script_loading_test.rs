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
use std::sync::{Arc, Mutex};
use tether_io::{
    Capabilities, DynamicImport, ExecutionContext, ImportScripts, ScriptError, ScriptLoader,
};

/// Records every reference it is asked to load and optionally fails.
#[derive(Debug, Default)]
struct RecordingPrimitive {
    calls: Mutex<Vec<String>>,
    failure: Option<String>,
}

impl RecordingPrimitive {
    fn failing(details: &str) -> Self {
        Self {
            failure: Some(details.to_string()),
            ..Default::default()
        }
    }

    fn record(&self, reference: &str) -> Result<(), ScriptError> {
        self.calls.lock().unwrap().push(reference.to_string());
        match &self.failure {
            Some(details) => Err(ScriptError::Load {
                reference: reference.to_string(),
                details: details.clone(),
            }),
            None => Ok(()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImportScripts for RecordingPrimitive {
    async fn import_scripts(&self, reference: &str) -> Result<(), ScriptError> {
        self.record(reference)
    }
}

#[async_trait]
impl DynamicImport for RecordingPrimitive {
    async fn import(&self, reference: &str) -> Result<(), ScriptError> {
        self.record(reference)
    }
}

#[tokio::test]
async fn test_worker_primitive_is_preferred() {
    let in_worker = Arc::new(RecordingPrimitive::default());
    let dynamic = Arc::new(RecordingPrimitive::default());
    let context = ExecutionContext::resolve(
        Capabilities::none()
            .with_import_scripts(in_worker.clone())
            .with_dynamic_import(dynamic.clone()),
    );
    assert_eq!(context.name(), "worker");

    ScriptLoader::new(context)
        .load_executable("engine.js")
        .await
        .unwrap();

    assert_eq!(in_worker.calls(), vec!["engine.js"]);
    assert!(dynamic.calls().is_empty());
}

#[tokio::test]
async fn test_dynamic_import_is_the_fallback() {
    let dynamic = Arc::new(RecordingPrimitive::default());
    let context =
        ExecutionContext::resolve(Capabilities::none().with_dynamic_import(dynamic.clone()));
    assert_eq!(context.name(), "main");

    let loader = ScriptLoader::new(context);
    loader.load_executable("engine.js").await.unwrap();
    loader.load_executable("fonts.js").await.unwrap();

    assert_eq!(dynamic.calls(), vec!["engine.js", "fonts.js"]);
}

#[tokio::test]
async fn test_missing_capability_rejects() {
    let loader = ScriptLoader::new(ExecutionContext::resolve(Capabilities::none()));
    assert!(matches!(loader.context(), ExecutionContext::Bare));

    assert_eq!(
        loader.load_executable("engine.js").await,
        Err(ScriptError::CapabilityMissing)
    );
}

#[tokio::test]
async fn test_malformed_reference_never_reaches_primitive() {
    let dynamic = Arc::new(RecordingPrimitive::default());
    let loader = ScriptLoader::new(ExecutionContext::Main(dynamic.clone()));

    for reference in ["", "   ", "engine\n.js"] {
        assert_eq!(
            loader.load_executable(reference).await,
            Err(ScriptError::MalformedReference(reference.to_string()))
        );
    }
    assert!(dynamic.calls().is_empty());
}

#[tokio::test]
async fn test_primitive_failure_is_propagated() {
    let in_worker = Arc::new(RecordingPrimitive::failing("network unreachable"));
    let loader = ScriptLoader::new(ExecutionContext::Worker(in_worker));

    let err = loader.load_executable("engine.js").await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "failed to load 'engine.js': network unreachable"
    );
}
