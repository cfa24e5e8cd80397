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

//! Thread-tagged output multiplexing.
//!
//! Every worker thread funnels its diagnostic lines through one
//! [`OutputMultiplexer`]. While the multiplexer is [`OutputMode::Suppressed`]
//! lines are kept in a bounded [`LogRing`]; entering [`OutputMode::Live`]
//! flushes the ring to the sink and later lines go straight through.

mod ring;
mod sink;

pub use self::ring::{LogLine, LogRing};
pub use self::sink::{DiagnosticSink, LogSink, MemorySink, WORKER_LOG_TARGET};

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tether_core::{FlagStore, StorageError, ThreadId};

/// Flag store key under which the output mode is persisted.
pub const OUTPUT_MODE_KEY: &str = "tether.output-mode";

/// Number of lines kept while output is suppressed.
pub const DEFAULT_CAPACITY: usize = 30;

/// Whether diagnostic lines are buffered or written immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Lines are buffered in the ring.
    #[default]
    Suppressed,
    /// Lines are written to the sink as they arrive.
    Live,
}

impl OutputMode {
    /// The persisted representation of the mode.
    pub fn as_str(self) -> &'static str {
        match self {
            OutputMode::Suppressed => "suppressed",
            OutputMode::Live => "live",
        }
    }

    /// Parses a persisted value. Unknown values read as `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "suppressed" => Some(OutputMode::Suppressed),
            "live" => Some(OutputMode::Live),
            _ => None,
        }
    }

    /// The mode a toggle switches to.
    pub fn toggled(self) -> Self {
        match self {
            OutputMode::Suppressed => OutputMode::Live,
            OutputMode::Live => OutputMode::Suppressed,
        }
    }

    /// Reads the persisted mode, falling back to [`OutputMode::Suppressed`].
    pub fn restore(store: &dyn FlagStore) -> Self {
        match store.get(OUTPUT_MODE_KEY) {
            Ok(Some(value)) => OutputMode::parse(&value).unwrap_or_else(|| {
                log::warn!("Ignoring unknown persisted output mode '{value}'.");
                OutputMode::Suppressed
            }),
            Ok(None) => OutputMode::Suppressed,
            Err(e) => {
                log::warn!("Failed to read persisted output mode: {e}");
                OutputMode::Suppressed
            }
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
enum OutputState {
    Suppressed(LogRing),
    Live,
}

impl OutputState {
    fn entering(mode: OutputMode, capacity: usize) -> Self {
        match mode {
            OutputMode::Suppressed => OutputState::Suppressed(LogRing::new(capacity)),
            OutputMode::Live => OutputState::Live,
        }
    }

    fn mode(&self) -> OutputMode {
        match self {
            OutputState::Suppressed(_) => OutputMode::Suppressed,
            OutputState::Live => OutputMode::Live,
        }
    }
}

/// Collects diagnostic lines from many threads and buffers or emits them
/// depending on the persisted [`OutputMode`].
#[derive(Debug)]
pub struct OutputMultiplexer {
    state: Mutex<OutputState>,
    capacity: usize,
    store: Arc<dyn FlagStore>,
    sink: Arc<dyn DiagnosticSink>,
}

impl OutputMultiplexer {
    /// Creates a multiplexer with the default ring capacity, restoring the
    /// mode persisted in `store`.
    pub fn new(store: Arc<dyn FlagStore>, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self::with_capacity(store, sink, DEFAULT_CAPACITY)
    }

    /// Creates a multiplexer keeping at most `capacity` suppressed lines.
    pub fn with_capacity(
        store: Arc<dyn FlagStore>,
        sink: Arc<dyn DiagnosticSink>,
        capacity: usize,
    ) -> Self {
        let mode = OutputMode::restore(store.as_ref());
        log::debug!("Thread output starts {mode} (capacity {capacity}).");
        Self {
            state: Mutex::new(OutputState::entering(mode, capacity)),
            capacity,
            store,
            sink,
        }
    }

    fn state(&self) -> MutexGuard<'_, OutputState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The current mode.
    pub fn mode(&self) -> OutputMode {
        self.state().mode()
    }

    /// Maximum number of lines kept while suppressed.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Emits one line produced by `thread_id`.
    pub fn emit(&self, thread_id: ThreadId, text: impl Into<String>) {
        let line = LogLine::new(thread_id, text);
        match &mut *self.state() {
            OutputState::Live => self.sink.write_line(&line),
            OutputState::Suppressed(ring) => {
                if let Some(evicted) = ring.push(line) {
                    log::trace!("Output ring full, evicted: {evicted}");
                }
            }
        }
    }

    /// Switches between [`OutputMode::Suppressed`] and [`OutputMode::Live`]
    /// and returns the new mode.
    ///
    /// The new mode is persisted before the switch. Entering `Live` flushes
    /// every buffered line in insertion order; entering `Suppressed` starts
    /// from an empty ring.
    ///
    /// # Errors
    /// Returns the store's error if the new mode could not be persisted. The
    /// mode is left unchanged in that case.
    pub fn toggle(&self) -> Result<OutputMode, StorageError> {
        let mut state = self.state();
        let next = state.mode().toggled();
        self.store.set(OUTPUT_MODE_KEY, next.as_str())?;

        let previous = std::mem::replace(&mut *state, OutputState::entering(next, self.capacity));
        if let OutputState::Suppressed(mut ring) = previous {
            for line in ring.drain() {
                self.sink.write_line(&line);
            }
        }

        log::info!("Thread output is now {next}.");
        Ok(next)
    }

    /// Returns a copy of the buffered lines, oldest first.
    ///
    /// Always empty while [`OutputMode::Live`].
    pub fn buffered(&self) -> Vec<LogLine> {
        match &*self.state() {
            OutputState::Suppressed(ring) => ring.iter().cloned().collect(),
            OutputState::Live => Vec::new(),
        }
    }
}
