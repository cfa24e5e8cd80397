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

use super::ring::LogLine;
use std::fmt::Debug;
use std::sync::{Arc, Mutex, PoisonError};

/// Log target used by [`LogSink`].
pub const WORKER_LOG_TARGET: &str = "tether::worker";

/// Destination of emitted diagnostic lines.
pub trait DiagnosticSink: Send + Sync + Debug {
    /// Writes one tagged line.
    fn write_line(&self, line: &LogLine);
}

/// Forwards lines to the `log` facade at `info` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn write_line(&self, line: &LogLine) {
        log::info!(target: WORKER_LOG_TARGET, "{line}");
    }
}

/// Captures lines in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<LogLine>>>,
}

impl MemorySink {
    /// Creates an empty capturing sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every line written so far, in write order.
    pub fn lines(&self) -> Vec<LogLine> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DiagnosticSink for MemorySink {
    fn write_line(&self, line: &LogLine) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.clone());
    }
}
