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

//! # Tether Telemetry
//!
//! Diagnostic output for the bridge: the thread-tagged output multiplexer that
//! fans worker log lines into one sink, and logger initialisation for the
//! coordinating process.

pub mod logging;
pub mod output;

pub use logging::init_logging;
pub use output::{
    DiagnosticSink, LogLine, LogRing, LogSink, MemorySink, OutputMode, OutputMultiplexer,
    DEFAULT_CAPACITY, OUTPUT_MODE_KEY,
};
