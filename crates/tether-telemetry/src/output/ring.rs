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

use std::collections::VecDeque;
use std::fmt;
use tether_core::ThreadId;

/// One immutable line of diagnostic output tagged with its originating thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    thread_id: ThreadId,
    text: String,
}

impl LogLine {
    /// Creates a line emitted by `thread_id`.
    pub fn new(thread_id: ThreadId, text: impl Into<String>) -> Self {
        Self {
            thread_id,
            text: text.into(),
        }
    }

    /// The thread that emitted the line.
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// The untagged text.
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[thread {}] {}", self.thread_id, self.text)
    }
}

/// A bounded FIFO of [`LogLine`]s that evicts the oldest line when full.
#[derive(Debug, Clone)]
pub struct LogRing {
    lines: VecDeque<LogLine>,
    capacity: usize,
}

impl LogRing {
    /// Creates an empty ring holding at most `capacity` lines.
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `line`, returning the line evicted to make room, if any.
    ///
    /// The newest line is always kept; with a capacity of zero nothing is.
    pub fn push(&mut self, line: LogLine) -> Option<LogLine> {
        if self.capacity == 0 {
            return Some(line);
        }
        let evicted = if self.lines.len() >= self.capacity {
            self.lines.pop_front()
        } else {
            None
        };
        self.lines.push_back(line);
        evicted
    }

    /// Removes and returns every line, oldest first.
    pub fn drain(&mut self) -> Vec<LogLine> {
        self.lines.drain(..).collect()
    }

    /// Iterates over the buffered lines, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &LogLine> {
        self.lines.iter()
    }

    /// Number of buffered lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns `true` if no line is buffered.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Maximum number of lines kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
