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

//! Contract for the persisted key/value store backing process-wide toggles.

use crate::error::StorageError;
use std::fmt::Debug;

/// A small persisted key/value store.
///
/// Values written through [`FlagStore::set`] must survive a restart of the
/// coordinating process. Implementations live in `tether-infra`.
pub trait FlagStore: Send + Sync + Debug {
    /// Reads the value stored under `key`, or `None` if nothing was stored.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}
