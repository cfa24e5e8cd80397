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

//! # Tether SDK
//!
//! The public entry point: a [`Bridge`] ties request/response correlation,
//! resource and executable loading, and thread-tagged worker output
//! together behind one object.
//!
//! ```no_run
//! # async fn demo() -> anyhow::Result<()> {
//! use std::sync::Arc;
//! use tether_sdk::{Bridge, BridgeConfig, ExecutionContext, ThreadWorkerSpawner, WorkerScope};
//!
//! let spawner = ThreadWorkerSpawner::with_resource_loader();
//! spawner.register("echo", |mut scope: WorkerScope| {
//!     scope.serve(|request| request.payload.clone())?;
//!     Ok(())
//! });
//!
//! let config = BridgeConfig::default();
//! let bridge = Bridge::new(
//!     &config,
//!     Arc::new(spawner),
//!     config.open_flag_store()?,
//!     ExecutionContext::Bare,
//! );
//! let worker = bridge.spawn_worker("echo")?;
//! let answer = bridge.request(&worker, serde_json::json!({ "ping": true })).await?;
//! println!("{}", answer.payload);
//! # Ok(())
//! # }
//! ```

mod bridge;
mod config;

pub use bridge::{Bridge, BridgeError, RequestHandler, WorkerHandle};
pub use config::{BridgeConfig, ConfigError};

pub use tether_core::{CorrelatedMessage, FlagStore, RequestId, ResourceDescriptor, WorkerSpawner};
pub use tether_infra::{FileFlagStore, MemoryFlagStore, ThreadWorkerSpawner, WorkerScope};
pub use tether_io::{Capabilities, ExecutionContext, LoadError, ScriptError};
pub use tether_telemetry::{init_logging, OutputMode};
