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

use std::sync::{Arc, PoisonError, RwLock};

/// A byte buffer shared between the coordinating process and its workers.
///
/// Cloning the handle does not copy the bytes: every clone observes writes
/// made through any other clone.
#[derive(Debug, Clone, Default)]
pub struct SharedMemory {
    bytes: Arc<RwLock<Vec<u8>>>,
}

impl SharedMemory {
    /// Creates an empty shared buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a shared buffer initialised with `bytes`.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Arc::new(RwLock::new(bytes)),
        }
    }

    /// Replaces the contents of the buffer.
    pub fn store(&self, bytes: Vec<u8>) {
        *self.bytes.write().unwrap_or_else(PoisonError::into_inner) = bytes;
    }

    /// Returns a copy of the current contents.
    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of bytes currently stored.
    pub fn len(&self) -> usize {
        self.bytes.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if both handles point at the same buffer.
    pub fn ptr_eq(&self, other: &SharedMemory) -> bool {
        Arc::ptr_eq(&self.bytes, &other.bytes)
    }
}

/// Names a compiled module a worker must instantiate before doing its work.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleHandle(Arc<str>);

impl ModuleHandle {
    /// Creates a handle for the module named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self(Arc::from(name.into()))
    }

    /// The module name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_the_same_bytes() {
        let memory = SharedMemory::new();
        let worker_view = memory.clone();

        worker_view.store(vec![1, 2, 3]);

        assert_eq!(memory.to_vec(), vec![1, 2, 3]);
        assert_eq!(memory.len(), 3);
        assert!(memory.ptr_eq(&worker_view));
    }

    #[test]
    fn test_distinct_buffers_are_not_shared() {
        let a = SharedMemory::from_bytes(vec![7]);
        let b = SharedMemory::from_bytes(vec![7]);
        assert!(!a.ptr_eq(&b));
        assert!(SharedMemory::new().is_empty());
    }

    #[test]
    fn test_module_handle_name() {
        let module = ModuleHandle::new("engine.wasm");
        assert_eq!(module.name(), "engine.wasm");
        assert_eq!(module.clone(), module);
    }
}
