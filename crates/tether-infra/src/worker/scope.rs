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

use serde_json::Value;
use std::collections::VecDeque;
use tether_core::{
    ChannelError, CorrelatedMessage, HostMessage, RequestId, ThreadId, WorkerEvent, WorkerMessage,
};

/// The worker side of a thread-backed channel, handed to a worker body.
///
/// All calls block the worker thread; none of them block the coordinating
/// process.
#[derive(Debug)]
pub struct WorkerScope {
    thread_id: ThreadId,
    inbox: flume::Receiver<HostMessage>,
    outbox: flume::Sender<WorkerEvent>,
    backlog: VecDeque<HostMessage>,
    next_request: u64,
}

impl WorkerScope {
    pub(crate) fn new(
        thread_id: ThreadId,
        inbox: flume::Receiver<HostMessage>,
        outbox: flume::Sender<WorkerEvent>,
    ) -> Self {
        Self {
            thread_id,
            inbox,
            outbox,
            backlog: VecDeque::new(),
            next_request: 0,
        }
    }

    /// The thread id this worker tags its log lines with.
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Posts `message` to the coordinating process.
    pub fn post(&self, message: WorkerMessage) -> Result<(), ChannelError> {
        self.outbox
            .send(WorkerEvent::Message(message))
            .map_err(|_| ChannelError::Disconnected)
    }

    /// Posts one diagnostic line tagged with this worker's thread id.
    pub fn log(&self, text: impl Into<String>) -> Result<(), ChannelError> {
        self.post(WorkerMessage::Log {
            thread_id: self.thread_id,
            text: text.into(),
        })
    }

    /// Answers the host request `id`.
    pub fn respond(&self, id: RequestId, payload: Value) -> Result<(), ChannelError> {
        self.post(WorkerMessage::Response { id, payload })
    }

    /// Waits for the next message from the coordinating process.
    ///
    /// Returns `None` once the host asked the worker to stop or went away.
    pub fn recv(&mut self) -> Option<HostMessage> {
        let message = match self.backlog.pop_front() {
            Some(message) => message,
            None => self.inbox.recv().ok()?,
        };
        match message {
            HostMessage::Shutdown => None,
            other => Some(other),
        }
    }

    /// Sends a request to the coordinating process and blocks until its
    /// response arrives.
    ///
    /// Other messages received meanwhile are kept for later [`WorkerScope::recv`]
    /// calls.
    pub fn request(&mut self, payload: Value) -> Result<CorrelatedMessage, ChannelError> {
        let id = RequestId(self.next_request);
        self.next_request += 1;
        self.post(WorkerMessage::Request { id, payload })?;

        loop {
            match self.inbox.recv() {
                Ok(HostMessage::Response(response)) if response.id == id => return Ok(response),
                Ok(HostMessage::Shutdown) => {
                    self.backlog.push_back(HostMessage::Shutdown);
                    return Err(ChannelError::Disconnected);
                }
                Ok(other) => self.backlog.push_back(other),
                Err(_) => return Err(ChannelError::Disconnected),
            }
        }
    }

    /// Answers every host request with `handler` until the worker is asked
    /// to stop.
    pub fn serve<F>(&mut self, mut handler: F) -> Result<(), ChannelError>
    where
        F: FnMut(&CorrelatedMessage) -> Value,
    {
        while let Some(message) = self.recv() {
            match message {
                HostMessage::Request(request) => {
                    let payload = handler(&request);
                    self.respond(request.id, payload)?;
                }
                other => log::debug!(
                    "Worker thread {} ignoring {other:?} while serving.",
                    self.thread_id
                ),
            }
        }
        Ok(())
    }
}
