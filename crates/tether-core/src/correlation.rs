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

//! Request/response correlation.
//!
//! The [`CorrelationRegistry`] hands out fresh [`RequestId`]s and parks one
//! single-shot waiter per outstanding id until the matching response is
//! delivered. It is an explicitly constructed value: every bridge owns its
//! own instance and tests can build isolated ones.

use crate::error::CorrelationError;
use crate::worker::{CorrelatedMessage, RequestId};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// A registered waiter: the registration it belongs to and where its
/// response goes.
type Waiters = HashMap<RequestId, (u64, oneshot::Sender<CorrelatedMessage>)>;

#[derive(Debug, Default)]
struct RegistryInner {
    next_id: AtomicU64,
    next_registration: AtomicU64,
    pending: Mutex<Waiters>,
}

impl RegistryInner {
    fn pending(&self) -> MutexGuard<'_, Waiters> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Assigns correlation ids and resolves waiters when their response arrives.
///
/// Cloning the registry yields another handle to the same table.
#[derive(Debug, Clone, Default)]
pub struct CorrelationRegistry {
    inner: Arc<RegistryInner>,
}

impl CorrelationRegistry {
    /// Creates an empty registry whose first id is `0`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a fresh id, strictly greater than every id issued before.
    pub fn next_id(&self) -> RequestId {
        RequestId(self.inner.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Registers a waiter for `id` and returns the future it resolves through.
    ///
    /// Registration happens immediately, so a response delivered before the
    /// future is first polled is not lost. Dropping the returned future
    /// unregisters the waiter.
    ///
    /// # Errors
    /// Returns [`CorrelationError::DoubleRegistration`] if a waiter for `id`
    /// is already outstanding. The existing waiter is left untouched.
    pub fn wait_for(&self, id: RequestId) -> Result<PendingResponse, CorrelationError> {
        let mut pending = self.inner.pending();
        if pending.contains_key(&id) {
            log::error!("Request {id} already has a registered waiter.");
            return Err(CorrelationError::DoubleRegistration(id));
        }

        let registration = self.inner.next_registration.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = oneshot::channel();
        pending.insert(id, (registration, sender));
        log::trace!("Registered waiter for request {id}.");

        Ok(PendingResponse {
            id,
            registration,
            receiver,
            registry: Arc::downgrade(&self.inner),
            settled: false,
        })
    }

    /// Resolves the waiter registered for `message.id` with the full message.
    ///
    /// Returns `false` when no waiter is registered for the id (never
    /// registered, already resolved, or given up). That case is logged as a
    /// warning and the message is dropped.
    pub fn deliver(&self, message: CorrelatedMessage) -> bool {
        let id = message.id;
        let Some((_, sender)) = self.inner.pending().remove(&id) else {
            log::warn!("no message waiting for id {id}");
            return false;
        };

        if sender.send(message).is_err() {
            log::debug!("Waiter for request {id} went away before its response was delivered.");
            return false;
        }
        log::trace!("Delivered response for request {id}.");
        true
    }

    /// Returns `true` if a waiter is registered for `id`.
    #[must_use]
    pub fn is_pending(&self, id: RequestId) -> bool {
        self.inner.pending().contains_key(&id)
    }

    /// Returns the number of outstanding waiters.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.pending().len()
    }
}

/// A registered waiter for one correlated response.
///
/// Resolves with the delivered [`CorrelatedMessage`]. There is no built-in
/// timeout: race it against a timer to bound the wait.
#[derive(Debug)]
#[must_use = "dropping a PendingResponse unregisters the waiter"]
pub struct PendingResponse {
    id: RequestId,
    registration: u64,
    receiver: oneshot::Receiver<CorrelatedMessage>,
    registry: Weak<RegistryInner>,
    settled: bool,
}

impl PendingResponse {
    /// The id this waiter is registered for.
    pub fn id(&self) -> RequestId {
        self.id
    }
}

impl Future for PendingResponse {
    type Output = Result<CorrelatedMessage, CorrelationError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let id = self.id;
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(message)) => {
                self.settled = true;
                Poll::Ready(Ok(message))
            }
            Poll::Ready(Err(_)) => {
                self.settled = true;
                Poll::Ready(Err(CorrelationError::RegistryDropped(id)))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for PendingResponse {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let Some(inner) = self.registry.upgrade() else {
            return;
        };
        let mut pending = inner.pending();
        // The id may have been registered again after this waiter was resolved.
        let owned = pending
            .get(&self.id)
            .is_some_and(|(registration, _)| *registration == self.registration);
        if owned {
            pending.remove(&self.id);
            log::debug!("Waiter for request {} gave up before its response arrived.", self.id);
        }
    }
}
