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

use super::scope::WorkerScope;
use anyhow::bail;
use tether_core::{HostMessage, WorkerMessage};

/// Worker body performing one resource load.
///
/// Waits for a single [`HostMessage::LoadResource`], reads the file named by
/// the descriptor's location into its shared memory and reports
/// `load-complete` or `load-error`. The worker exits afterwards.
pub fn resource_loader_body(mut scope: WorkerScope) -> anyhow::Result<()> {
    let Some(message) = scope.recv() else {
        return Ok(());
    };
    let descriptor = match message {
        HostMessage::LoadResource(descriptor) => descriptor,
        other => bail!("resource loader expected a load request, got {other:?}"),
    };

    if let Some(module) = &descriptor.module {
        scope.log(format!("instantiating module {}", module.name()))?;
    }

    match std::fs::read(&descriptor.location) {
        Ok(bytes) => {
            let len = bytes.len();
            descriptor.memory.store(bytes);
            scope.log(format!("loaded {} ({len} bytes)", descriptor.name))?;
            scope.post(WorkerMessage::LoadComplete)?;
        }
        Err(e) => {
            scope.post(WorkerMessage::LoadError {
                error: format!("{}: {e}", descriptor.location),
            })?;
        }
    }
    Ok(())
}
