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

use super::memory::{ModuleHandle, SharedMemory};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Integer tag linking an outgoing request to its eventual response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Numeric tag of the thread a diagnostic line originates from.
pub type ThreadId = u32;

/// A message carrying a correlation id and an arbitrary JSON payload.
///
/// This is the full message a waiter in the
/// [`CorrelationRegistry`](crate::CorrelationRegistry) resolves with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelatedMessage {
    /// The correlation id.
    pub id: RequestId,
    /// Everything else the message carries.
    #[serde(default)]
    pub payload: Value,
}

impl CorrelatedMessage {
    /// Creates a message for `id` carrying `payload`.
    pub fn new(id: RequestId, payload: Value) -> Self {
        Self { id, payload }
    }
}

/// A message posted by a worker to the coordinating process.
///
/// On the wire this is a JSON object discriminated by its `"type"` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WorkerMessage {
    /// Answer to a request the coordinating process issued.
    Response {
        /// Correlation id of the request being answered.
        id: RequestId,
        /// The answer.
        #[serde(default)]
        payload: Value,
    },
    /// A request issued by the worker, answered with [`HostMessage::Response`].
    Request {
        /// Worker-chosen correlation id.
        id: RequestId,
        /// The request body.
        #[serde(default)]
        payload: Value,
    },
    /// One line of diagnostic output.
    #[serde(rename_all = "camelCase")]
    Log {
        /// The thread that produced the line.
        thread_id: ThreadId,
        /// The line itself, without a trailing newline.
        text: String,
    },
    /// A resource load finished successfully.
    LoadComplete,
    /// A resource load failed.
    LoadError {
        /// Human-readable failure reason reported by the worker.
        error: String,
    },
}

impl WorkerMessage {
    /// Decodes a message from its JSON wire form.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Encodes the message into its JSON wire form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Short name of the message kind, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerMessage::Response { .. } => "response",
            WorkerMessage::Request { .. } => "request",
            WorkerMessage::Log { .. } => "log",
            WorkerMessage::LoadComplete => "load-complete",
            WorkerMessage::LoadError { .. } => "load-error",
        }
    }
}

/// Describes one resource a dedicated worker must load.
#[derive(Debug, Clone)]
pub struct ResourceDescriptor {
    /// Display name of the resource, used in diagnostics.
    pub name: String,
    /// Where the worker reads the resource from (a path or URL).
    pub location: String,
    /// Buffer the worker publishes the loaded bytes into.
    pub memory: SharedMemory,
    /// Compiled module the worker instantiates before loading, if any.
    pub module: Option<ModuleHandle>,
}

impl ResourceDescriptor {
    /// Creates a descriptor with a fresh, empty shared buffer and no module.
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            memory: SharedMemory::new(),
            module: None,
        }
    }

    /// Uses `memory` as the destination buffer.
    pub fn with_memory(mut self, memory: SharedMemory) -> Self {
        self.memory = memory;
        self
    }

    /// Attaches the compiled module the worker must instantiate.
    pub fn with_module(mut self, module: ModuleHandle) -> Self {
        self.module = Some(module);
        self
    }
}

/// A message posted by the coordinating process to a worker.
#[derive(Debug, Clone)]
pub enum HostMessage {
    /// A correlated request the worker must answer with [`WorkerMessage::Response`].
    Request(CorrelatedMessage),
    /// The answer to a [`WorkerMessage::Request`].
    Response(CorrelatedMessage),
    /// Asks a dedicated loader worker to load one resource.
    LoadResource(ResourceDescriptor),
    /// Asks the worker to stop.
    Shutdown,
}

/// Something a worker channel observed: a message or an error.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// The worker posted a message.
    Message(WorkerMessage),
    /// The worker raised an error (uncaught failure, crash).
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_wire_shape() {
        let message = WorkerMessage::Response {
            id: RequestId(1),
            payload: json!({ "result": "ok" }),
        };
        let encoded: Value = serde_json::from_str(&message.to_json().unwrap()).unwrap();
        assert_eq!(
            encoded,
            json!({ "type": "response", "id": 1, "payload": { "result": "ok" } })
        );
    }

    #[test]
    fn test_load_signals_decode() {
        assert_eq!(
            WorkerMessage::from_json(r#"{"type":"load-complete"}"#).unwrap(),
            WorkerMessage::LoadComplete
        );
        assert_eq!(
            WorkerMessage::from_json(r#"{"type":"load-error","error":"bad format"}"#).unwrap(),
            WorkerMessage::LoadError {
                error: "bad format".to_string()
            }
        );
    }

    #[test]
    fn test_log_uses_camel_case_thread_id() {
        let decoded = WorkerMessage::from_json(r#"{"type":"log","threadId":7,"text":"hi"}"#)
            .expect("log line should decode");
        assert_eq!(
            decoded,
            WorkerMessage::Log {
                thread_id: 7,
                text: "hi".to_string()
            }
        );
        assert_eq!(decoded.kind(), "log");
    }

    #[test]
    fn test_missing_payload_defaults_to_null() {
        let decoded = WorkerMessage::from_json(r#"{"type":"response","id":3}"#).unwrap();
        assert_eq!(
            decoded,
            WorkerMessage::Response {
                id: RequestId(3),
                payload: Value::Null
            }
        );
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(WorkerMessage::from_json(r#"{"type":"teleport"}"#).is_err());
        assert!(WorkerMessage::from_json(r#"{"id":1}"#).is_err());
    }
}
