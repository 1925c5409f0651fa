//! Notification Bus
//!
//! Wakes suspended exchange calls when the peer touches the conduit or the
//! invitation status moves.
//!
//! A subscription is a [`Waiter`]: a scoped handle that owns an event queue
//! and unregisters itself on drop, whichever way the owning task exits.
//! Events published while nobody is waiting stay queued in the waiter, so a
//! waiter registered before an operation cannot miss what that operation
//! triggers.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use vouch_core::{InviteError, InviteEvent, InviteResult};

type EventFilter = Box<dyn Fn(&InviteEvent) -> bool + Send + Sync>;

struct Registration {
    filter: EventFilter,
    sender: mpsc::UnboundedSender<InviteEvent>,
}

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    registrations: Mutex<HashMap<u64, Registration>>,
}

/// In-process notification bus
///
/// Cheap to clone; clones share the same subscriptions.
#[derive(Clone, Default)]
pub struct NotificationBus {
    inner: Arc<BusInner>,
}

impl NotificationBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` to every waiter whose filter accepts it
    ///
    /// Never blocks. Waiters whose task already went away are pruned.
    pub fn publish(&self, event: InviteEvent) {
        let mut registrations = self.inner.registrations.lock();
        let mut delivered = 0usize;
        registrations.retain(|_, registration| {
            if !(registration.filter)(&event) {
                return true;
            }
            delivered += 1;
            registration.sender.send(event.clone()).is_ok()
        });
        tracing::trace!(
            organization_id = %event.organization_id(),
            token = %event.token(),
            delivered,
            "published invite event"
        );
    }

    /// Register a waiter for events accepted by `filter`
    pub fn subscribe<F>(&self, filter: F) -> Waiter
    where
        F: Fn(&InviteEvent) -> bool + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::unbounded_channel();
        self.inner.registrations.lock().insert(
            id,
            Registration {
                filter: Box::new(filter),
                sender,
            },
        );
        Waiter {
            id,
            bus: Arc::downgrade(&self.inner),
            receiver,
            signaled: VecDeque::new(),
        }
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.inner.registrations.lock().len()
    }
}

impl std::fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Scoped subscription to the bus
///
/// Dropping the waiter releases its registration.
pub struct Waiter {
    id: u64,
    bus: Weak<BusInner>,
    receiver: mpsc::UnboundedReceiver<InviteEvent>,
    signaled: VecDeque<InviteEvent>,
}

impl Waiter {
    /// Suspend until at least one matching event has been published
    ///
    /// Returns immediately if the waiter is already signaled.
    pub async fn wait(&mut self) -> InviteResult<()> {
        if !self.signaled.is_empty() {
            return Ok(());
        }
        match self.receiver.recv().await {
            Some(event) => {
                self.signaled.push_back(event);
                Ok(())
            }
            None => Err(InviteError::internal("notification bus closed")),
        }
    }

    /// Reset the signal
    ///
    /// Only events already observed by [`Waiter::wait`] are discarded; events
    /// published since then stay queued and signal the next `wait`.
    pub fn clear(&mut self) {
        self.signaled.clear();
    }

    #[cfg(test)]
    fn is_signaled(&self) -> bool {
        !self.signaled.is_empty()
    }

    /// Take the next matching event, suspending if none is queued
    ///
    /// Returns `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<InviteEvent> {
        if let Some(event) = self.signaled.pop_front() {
            return Some(event);
        }
        self.receiver.recv().await
    }
}

impl Drop for Waiter {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.registrations.lock().remove(&self.id);
        }
    }
}

impl std::fmt::Debug for Waiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Waiter")
            .field("id", &self.id)
            .field("signaled", &self.signaled.len())
            .finish()
    }
}
